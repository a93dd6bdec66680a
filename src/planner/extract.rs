//! Pull a JSON object out of free-form model text.
//!
//! Models wrap their JSON in prose or code fences. Each `{` is tried in turn
//! as the start of a balanced object, tracking string literals so braces
//! inside strings do not count.

use serde_json::Value;

/// The first substring of `text` that is a complete JSON object
pub fn extract_json_object(text: &str) -> Option<Value> {
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;

        // An unclosed brace swallows the rest of the text, truncated responses included
        let len = balanced_object_len(&text[start..])?;
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&text[start..start + len]) {
            return Some(value);
        }

        search_from = start + 1;
    }

    None
}

/// Byte length of the balanced `{...}` that `text` starts with
fn balanced_object_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_inside_prose_and_fences() {
        let text = "Aquí tienes tu plan:\n```json\n{\"budget\": {\"totalEstimated\": 500}}\n```\n¡Buen viaje!";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["budget"]["totalEstimated"], 500);
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let text = r#"{"title": "Cena {sorpresa}", "note": "usa \"}\" con cuidado"} y más texto }"#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["title"], "Cena {sorpresa}");
        assert_eq!(value["note"], "usa \"}\" con cuidado");
    }

    #[test]
    fn test_skips_brace_that_is_not_json() {
        let text = "Formato {dia} explicado abajo: {\"itinerary\": []}";
        let value = extract_json_object(text).unwrap();
        assert!(value["itinerary"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_first_of_several_objects_wins() {
        let text = r#"{"a": 1} {"b": 2}"#;
        assert_eq!(extract_json_object(text).unwrap()["a"], 1);
    }

    #[test]
    fn test_truncated_or_missing_object_is_none() {
        assert!(extract_json_object("{\"itinerary\": [{\"dayNumber\": 1}").is_none());
        assert!(extract_json_object("Lo siento, no puedo ayudar con eso.").is_none());
        assert!(extract_json_object("").is_none());
    }

    #[test]
    fn test_multibyte_text_around_object() {
        let text = "Días en Kyōto → {\"destino\": \"京都\"} ✈️";
        assert_eq!(extract_json_object(text).unwrap()["destino"], "京都");
    }
}
