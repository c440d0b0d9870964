//! "Dot" notation access into nested JSON maps (`pagination.total`).

use serde_json::{Map, Value};

/// Look up `path` in `map`. A literal key containing dots wins over the
/// nested interpretation.
pub fn get_path<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(value) = map.get(path) {
        return Some(value);
    }
    let mut segments = path.split('.');
    let mut current = map.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Store `value` at `path`, creating intermediate maps as needed. An
/// intermediate value that is not a map is replaced by one.
pub fn set_path(map: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut current = map;
    for segment in segments {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = match entry {
            Value::Object(next) => next,
            _ => return,
        };
    }
    current.insert(last.to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn get_walks_nested_maps() {
        let meta = map(json!({"pagination": {"total": 10, "links": {"next": "/p2"}}}));
        assert_eq!(get_path(&meta, "pagination.total"), Some(&json!(10)));
        assert_eq!(get_path(&meta, "pagination.links.next"), Some(&json!("/p2")));
        assert!(get_path(&meta, "pagination.count").is_none());
        assert!(get_path(&meta, "pagination.total.value").is_none());
    }

    #[test]
    fn literal_dotted_key_wins() {
        let meta = map(json!({"a.b": 1, "a": {"b": 2}}));
        assert_eq!(get_path(&meta, "a.b"), Some(&json!(1)));
    }

    #[test]
    fn set_creates_intermediate_maps() {
        let mut meta = Map::new();
        set_path(&mut meta, "pagination.total", json!(3));
        assert_eq!(Value::Object(meta.clone()), json!({"pagination": {"total": 3}}));

        set_path(&mut meta, "pagination.current_page", json!(1));
        assert_eq!(
            Value::Object(meta),
            json!({"pagination": {"total": 3, "current_page": 1}})
        );
    }

    #[test]
    fn set_replaces_scalar_intermediates() {
        let mut meta = map(json!({"pagination": 5}));
        set_path(&mut meta, "pagination.total", json!(2));
        assert_eq!(Value::Object(meta), json!({"pagination": {"total": 2}}));
    }

    #[test]
    fn set_without_dots_is_plain_insert() {
        let mut meta = Map::new();
        set_path(&mut meta, "cursor", json!("abc"));
        assert_eq!(Value::Object(meta), json!({"cursor": "abc"}));
    }
}
