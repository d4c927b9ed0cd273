//! Prompt for scene generation.

use worldforge_domain::{
    Description, WorldName, MAX_ACCESSORIES, MAX_NPCS, MAX_PHYSICS_OBJECTS, MAX_STATIC_OBJECTS,
};

use crate::infrastructure::ports::ChatMessage;

/// Fixed instruction: target schema, collection limits, content rules.
pub fn system_prompt() -> String {
    format!(
        r##"You are a game world generator. Turn the player's world description into a 3D scene for a browser game.

Respond with a single JSON object and nothing else. Use exactly this schema:

{{
  "terrain": {{ "shape": "plane", "size": 100, "color": "#RRGGBB" }},
  "staticObjects": [
    {{ "type": "box|sphere|cylinder|cone", "position": [x, y, z], "scale": [x, y, z], "color": "#RRGGBB", "name": "string" }}
  ],
  "physicsObjects": [
    {{
      "type": "box|sphere|cylinder|cone",
      "position": [x, y, z],
      "scale": [x, y, z],
      "color": "#RRGGBB",
      "name": "string",
      "interactionType": "none|collect|trigger|destination",
      "objectiveId": "id of the objective this object advances, or null",
      "points": 10,
      "message": "text shown when the player interacts"
    }}
  ],
  "lights": [
    {{ "type": "ambient|directional|point", "color": "#RRGGBB", "intensity": 0.5, "position": [x, y, z] }}
  ],
  "npcs": [
    {{ "name": "string", "position": [x, y, z], "color": "#RRGGBB", "dialogue": ["line", "line"], "objectiveId": "id or null" }}
  ],
  "objectives": [
    {{
      "id": "obj_1",
      "type": "collect|reach|talk|timed",
      "description": "what the player must do",
      "targetCount": 1,
      "currentCount": 0,
      "completed": false,
      "timeLimit": null,
      "points": 50
    }}
  ],
  "characterSpawn": [x, y, z],
  "characterAppearance": {{
    "body": {{ "height": 1.8, "build": "slim|average|muscular", "skinTone": "#RRGGBB" }},
    "head": {{ "hairStyle": "string", "hairColor": "#RRGGBB", "facialHair": "none|beard|mustache" }},
    "clothing": {{
      "top": {{ "type": "string", "color": "#RRGGBB" }},
      "bottom": {{ "type": "string", "color": "#RRGGBB" }},
      "footwear": {{ "type": "string", "color": "#RRGGBB" }}
    }},
    "accessories": [ {{ "type": "string", "color": "#RRGGBB" }} ]
  }}
}}

Limits:
- At most {static_objects} staticObjects
- At most {physics_objects} physicsObjects
- At most {npcs} npcs
- At most {accessories} accessories
- Between 3 and 5 objectives

Rules:
- Every objective id is a unique string, and every objectiveId refers to one of them
- All colors are hex strings such as "#4a7c59"
- All positions, scales and characterSpawn are arrays of exactly three numbers
- Keep everything inside the terrain; y = 0 is ground level
- NPC dialogue fits the theme of the world
- Include at least 2 lights: one ambient and one directional
- Make the world feel like the description: pick shapes, colors and names that match its mood"##,
        static_objects = MAX_STATIC_OBJECTS,
        physics_objects = MAX_PHYSICS_OBJECTS,
        npcs = MAX_NPCS,
        accessories = MAX_ACCESSORIES,
    )
}

/// Per-world instruction. Name and description are inserted verbatim.
pub fn user_prompt(name: &WorldName, description: &Description) -> String {
    format!(
        "Create a game world based on this description.\n\nWorld Name: {}\nWorld Description: {}",
        name.as_str(),
        description.as_str()
    )
}

/// The two-message conversation sent to the completion provider.
pub fn build_scene_prompt(name: &WorldName, description: &Description) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt()),
        ChatMessage::user(user_prompt(name, description)),
    ]
}
