use std::collections::HashMap;

/// Combine metadata maps, with later maps taking precedence over earlier ones
/// on conflicting keys.
///
/// Absence is preserved: if every input is `None`, the output is `None`. If
/// at least one input is present, the output is a present (possibly empty)
/// map, even when all present inputs are empty. Callers rely on that
/// distinction to detect unset→empty metadata transitions as real changes.
pub fn merge(maps: &[Option<&HashMap<String, String>>]) -> Option<HashMap<String, String>> {
    let mut output: Option<HashMap<String, String>> = None;
    for m in maps.iter().flatten() {
        let out = output.get_or_insert_with(HashMap::new);
        for (k, v) in *m {
            out.insert(k.clone(), v.clone());
        }
    }
    output
}
