//! Test fixtures and factory functions for request bodies.

use serde_json::{json, Value};

/// Single multiple-choice question; option 1 is correct.
pub fn choice_content() -> Value {
    json!({
        "title": "Capitales",
        "questions": [{
            "question": "¿Capital de España?",
            "options": ["Barcelona", "Madrid", "Sevilla"],
            "correctAnswer": 1
        }]
    })
}

/// Marker blob with three exercise sections.
pub fn chained_content() -> Value {
    json!(
        "#verdadero_falso\nEl sol es una estrella => V\n\
        #completar\nVivo en *Madrid*.\n\
        #marcar\nEl *perro* corre."
    )
}

/// Matching content declared as JSON text that never closes.
pub fn broken_matching_content() -> Value {
    json!({ "type": "matching", "body": "{\"pairs\": [" })
}

/// Matching content as `left = right` lines.
pub fn matching_content() -> Value {
    json!({ "type": "matching", "body": "perro = dog\ngato = cat" })
}

/// Create-player request with a fixed seed.
pub fn create_request(content: Value, mode: &str, layout: &str) -> Value {
    json!({
        "content": content,
        "mode": mode,
        "layout": layout,
        "seed": 7
    })
}
