/// Path processing utility functions / 路径处理工具函数

/// Clean and normalize a bucket key / 清理和规范化对象键
/// 1. Replace backslashes with forward slashes / 将反斜杠替换为正斜杠
/// 2. Clean . and .. in path / 清理路径中的 . 和 ..
/// 3. Strip leading and trailing / / 去掉首尾的 /
pub fn clean_key(path: &str) -> String {
    let path = path.replace('\\', "/");
    clean_segments(&path).join("/")
}

/// Split path into segments, handle ., .. and duplicate / / 拆分路径，处理 . 和 .. 和重复的 /
/// `..` never climbs above the first segment / `..` 不会越过根
fn clean_segments(path: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }

    parts
}

/// Join root prefix and relative path into a bucket key / 拼接根前缀与相对路径为对象键
///
/// The relative part is cleaned on its own first, so `..` inside it cannot
/// escape the root prefix. An empty relative path yields the cleaned root.
pub fn join_key(root: &str, relative: &str) -> String {
    let root = clean_key(root);
    let relative = clean_key(relative);

    match (root.is_empty(), relative.is_empty()) {
        (true, _) => relative,
        (false, true) => root,
        (false, false) => format!("{}/{}", root, relative),
    }
}
