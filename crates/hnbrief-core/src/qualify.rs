use crate::models::{ItemType, RawItem, SkipKind, SkipReason};

/// Decide whether an item is worth enriching.
///
/// Returns the external URL on success. A missing or blank URL is checked
/// first, so a job post without a link is `NoUrl`; a job or poll that does
/// carry a link is `NonTextType`.
pub fn qualify(item: &RawItem) -> Result<&str, SkipReason> {
    let url = match item.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url,
        _ => {
            return Err(SkipReason::new(
                item.id,
                SkipKind::NoUrl,
                format!(
                    "'{}' has no external URL",
                    item.title.as_deref().unwrap_or("untitled")
                ),
            ));
        }
    };

    if item.item_type != ItemType::Story {
        return Err(SkipReason::new(
            item.id,
            SkipKind::NonTextType,
            format!("item type '{}' is not enriched", item.item_type),
        ));
    }

    Ok(url)
}
