use crate::model::{FileId, MethodDefinitionRecord};

/// Pick the definition a call from `context` most likely means.
///
/// Same file wins, then a file under the context file's directory, then the
/// first candidate in index order.
pub fn pick<'a>(
    candidates: &'a [MethodDefinitionRecord],
    context: Option<&FileId>,
) -> Option<&'a MethodDefinitionRecord> {
    if candidates.len() <= 1 {
        return candidates.first();
    }
    let Some(context) = context else {
        return candidates.first();
    };
    if let Some(same_file) = candidates.iter().find(|c| &c.file_id == context) {
        return Some(same_file);
    }
    if let Some(dir) = context.path().parent().filter(|dir| !dir.as_os_str().is_empty()) {
        if let Some(nested) = candidates.iter().find(|c| c.file_path.starts_with(dir)) {
            return Some(nested);
        }
    }
    candidates.first()
}
