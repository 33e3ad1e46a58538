// ==========================================
// 表格批量导入引擎 - 属性树与点路径
// ==========================================
// 职责: 点路径键 (profile.email) 与嵌套属性树之间的互相转换
// 约束: 保持字段声明顺序（serde_json preserve_order）
// ==========================================

use serde_json::{Map, Value};

/// 一行记录的属性集合（嵌套树，键为顶层属性名）
pub type Attributes = Map<String, Value>;

/// 判断单元格/属性值是否为空
///
/// # 规则
/// - Null → 空
/// - 字符串 TRIM 后为空 → 空
/// - 空数组 / 空对象 → 空
/// - 数字、布尔值永远非空
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// 将点路径键值对展开为嵌套属性树
///
/// # 说明
/// - "profile.email" → {"profile": {"email": ...}}
/// - 中间节点若已是非对象值，会被对象覆盖（后写入者优先）
pub fn undot<I, K>(entries: I) -> Attributes
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let mut tree = Attributes::new();
    for (path, value) in entries {
        set_path(&mut tree, path.as_ref(), value);
    }
    tree
}

/// 将嵌套属性树压平为点路径键值对（非空对象递归展开，数组视为叶子）
pub fn dot(tree: &Attributes) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    dot_into(tree, "", &mut out);
    out
}

fn dot_into(tree: &Attributes, prefix: &str, out: &mut Vec<(String, Value)>) {
    for (key, value) in tree {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Object(child) if !child.is_empty() => dot_into(child, &path, out),
            _ => out.push((path, value.clone())),
        }
    }
}

/// 按点路径读取属性值
pub fn get_path<'a>(tree: &'a Attributes, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = tree.get(first)?;

    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }

    Some(current)
}

/// 按点路径写入属性值（自动创建中间对象）
pub fn set_path(tree: &mut Attributes, path: &str, value: Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let last = match segments.pop() {
        Some(last) => last,
        None => return,
    };

    let mut current = tree;
    for segment in segments {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = match entry {
            Value::Object(map) => map,
            _ => unreachable!("中间节点已强制为对象"),
        };
    }

    current.insert(last.to_string(), value);
}

/// 将属性值渲染为比较/展示用字符串
///
/// 字符串原样返回，Null 为空串，其余使用 JSON 表示
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_blank() {
        assert!(is_blank(&Value::Null));
        assert!(is_blank(&json!("   ")));
        assert!(is_blank(&json!([])));
        assert!(!is_blank(&json!(0)));
        assert!(!is_blank(&json!(false)));
        assert!(!is_blank(&json!("0")));
    }

    #[test]
    fn test_undot_builds_nested_tree() {
        let tree = undot(vec![
            ("name", json!("Alice")),
            ("profile.email", json!("a@example.com")),
            ("profile.address.city", json!("Paris")),
        ]);

        assert_eq!(
            Value::Object(tree),
            json!({
                "name": "Alice",
                "profile": {"email": "a@example.com", "address": {"city": "Paris"}}
            })
        );
    }

    #[test]
    fn test_undot_overwrites_scalar_parent() {
        let tree = undot(vec![("profile", json!("x")), ("profile.email", json!("e"))]);
        assert_eq!(get_path(&tree, "profile.email"), Some(&json!("e")));
    }

    #[test]
    fn test_dot_preserves_declaration_order() {
        let tree = undot(vec![
            ("b", json!(1)),
            ("a.y", json!(2)),
            ("a.x", json!(3)),
        ]);
        let keys: Vec<String> = dot(&tree).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a.y", "a.x"]);
    }

    #[test]
    fn test_get_path_missing() {
        let tree = undot(vec![("name", json!("Alice"))]);
        assert_eq!(get_path(&tree, "profile.email"), None);
        assert_eq!(get_path(&tree, "name.first"), None);
    }
}
