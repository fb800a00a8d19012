//! Filename-coded product images (`CODE_N.ext`).

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use catalog_core::IMAGE_SLOTS;
use regex::Regex;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

static FILE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)_(\d+)\.([A-Za-z0-9]+)$").expect("valid regex"));

/// An uploaded image file as received from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// A parsed `CODE_N.ext` file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFileName {
    /// Natural key of the target product.
    pub code: String,
    /// 1-based image slot.
    pub slot: usize,
    /// Lowercased extension.
    pub extension: String,
}

impl ImageFileName {
    /// Parses a file name, ignoring any directory prefix.
    ///
    /// # Errors
    ///
    /// Returns `invalid file name '<name>' ...` when the name does not match
    /// `CODE_N.ext`, the slot is outside 1..=5, or the extension is not an
    /// accepted image type.
    pub fn parse(file_name: &str) -> Result<Self, String> {
        let base = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(file_name)
            .trim();
        let invalid = |why: &str| format!("invalid file name '{base}': {why}");

        let caps = FILE_NAME
            .captures(base)
            .ok_or_else(|| invalid("expected CODE_N.ext"))?;

        let code = caps[1].trim().to_string();
        if code.is_empty() {
            return Err(invalid("missing product code"));
        }

        let slot = caps[2]
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=IMAGE_SLOTS).contains(n))
            .ok_or_else(|| invalid(&format!("image number must be between 1 and {IMAGE_SLOTS}")))?;

        let extension = caps[3].to_ascii_lowercase();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(invalid(&format!(
                "unsupported extension '.{extension}'; expected one of {}",
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }

        Ok(Self {
            code,
            slot,
            extension,
        })
    }

    /// Bucket object path the file is uploaded to.
    #[must_use]
    pub fn object_path(&self) -> String {
        format!("products/{}_{}.{}", self.code, self.slot, self.extension)
    }

    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self.extension.as_str() {
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            _ => "image/jpeg",
        }
    }
}

/// Tracks which slots each product code has claimed within one upload.
#[derive(Debug, Default)]
pub struct SlotTracker {
    claimed: HashMap<String, BTreeSet<usize>>,
}

impl SlotTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `slot` for `code` (case-insensitive).
    ///
    /// Slots come from parsed file names, so they are already within
    /// `1..=IMAGE_SLOTS` and a code can never claim more than that many.
    ///
    /// # Errors
    ///
    /// Returns a conflict message when the slot was already claimed.
    pub fn claim(&mut self, code: &str, slot: usize) -> Result<(), String> {
        let slots = self.claimed.entry(code.trim().to_lowercase()).or_default();
        if !slots.insert(slot) {
            return Err(format!(
                "image {slot} for '{code}' appears more than once in this upload"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_code_slot_and_extension() {
        let parsed = ImageFileName::parse("A1_2.JPG").expect("valid");
        assert_eq!(parsed.code, "A1");
        assert_eq!(parsed.slot, 2);
        assert_eq!(parsed.extension, "jpg");
        assert_eq!(parsed.object_path(), "products/A1_2.jpg");
        assert_eq!(parsed.content_type(), "image/jpeg");
    }

    #[test]
    fn code_may_contain_underscores() {
        let parsed = ImageFileName::parse("SKU_99_X_1.png").expect("valid");
        assert_eq!(parsed.code, "SKU_99_X");
        assert_eq!(parsed.slot, 1);
        assert_eq!(parsed.content_type(), "image/png");
    }

    #[test]
    fn directory_prefix_is_ignored() {
        let parsed = ImageFileName::parse("fotos/lote 3/B2_3.webp").expect("valid");
        assert_eq!(parsed.code, "B2");
    }

    #[test]
    fn slot_out_of_range_is_invalid() {
        let err = ImageFileName::parse("A1_6.jpg").unwrap_err();
        assert!(err.starts_with("invalid file name 'A1_6.jpg'"), "{err}");
        assert!(ImageFileName::parse("A1_0.jpg").is_err());
    }

    #[test]
    fn wrong_shape_or_extension_is_invalid() {
        assert!(ImageFileName::parse("A1.jpg").is_err());
        assert!(ImageFileName::parse("_1.jpg").is_err());
        assert!(ImageFileName::parse("A1_1").is_err());
        assert!(ImageFileName::parse("A1_1.pdf").is_err());
    }

    #[test]
    fn tracker_rejects_second_claim_on_same_slot() {
        let mut tracker = SlotTracker::new();
        assert!(tracker.claim("B2", 3).is_ok());
        assert!(tracker.claim("b2", 3).is_err());
        assert!(tracker.claim("B2", 4).is_ok());
    }

    #[test]
    fn tracker_accepts_every_slot_once_then_only_conflicts() {
        let mut tracker = SlotTracker::new();
        for slot in 1..=IMAGE_SLOTS {
            assert!(tracker.claim("C3", slot).is_ok());
        }
        assert_eq!(
            tracker.claim("c3", 5),
            Err("image 5 for 'c3' appears more than once in this upload".to_string())
        );
    }

    #[test]
    fn tracker_keeps_codes_independent() {
        let mut tracker = SlotTracker::new();
        for slot in 1..=IMAGE_SLOTS {
            assert!(tracker.claim("A1", slot).is_ok());
            assert!(tracker.claim("A2", slot).is_ok());
        }
    }
}
