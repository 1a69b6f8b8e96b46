//! Utterance templates for the Indonesian (`id`) locale.

use anyhow::Result;

use crate::analysis::FrameResult;
use crate::error::PipelineError;

pub const LOCALE: &str = "id";

pub const NO_DETECTION_PHRASE: &str = "Silakan arahkan kamera ke bahan makanan";
pub const CATEGORY_SUMMARY_PREFIX: &str = "Terlihat beberapa jenis bahan makanan: ";
pub const HELP_PHRASE: &str = "Anda dapat mengarahkan kamera anda ke rak dengan beberapa barang ataupun ke satu barang yang anda pegang untuk mendapatkan audio feedback terkait apa yang terlihat.";

/// Items that get their own phrasing, highest priority first.
pub const PRIORITY_ITEMS: [&str; 4] = ["tomat", "kubis", "wortel", "kentang"];

/// "You see {item} in front of you."
pub fn in_front_phrase(item: &str) -> String {
    format!("Terlihat {} di depan Anda", item)
}

/// Builds the sentence handed to the speech collaborator.
#[derive(Clone, Copy, Debug, Default)]
pub struct MessageGenerator;

impl MessageGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn locale(&self) -> &'static str {
        LOCALE
    }

    /// `labels` is the full label list of the frame, not just the focus.
    /// A priority item anywhere in it takes over the single-focus phrasing.
    pub fn generate(&self, result: &FrameResult, labels: &[String]) -> String {
        match result {
            FrameResult::NoDetection => NO_DETECTION_PHRASE.to_string(),
            FrameResult::SingleFocus { item } => {
                let priority = PRIORITY_ITEMS
                    .iter()
                    .find(|p| labels.iter().any(|l| l == *p));
                match priority {
                    Some(p) => in_front_phrase(p),
                    None => in_front_phrase(item),
                }
            }
            FrameResult::CategorySummary { categories } => {
                format!("{}{}", CATEGORY_SUMMARY_PREFIX, categories.join(", "))
            }
        }
    }

    /// Generate from a serialized result: a variant tag plus its content
    /// (the item, or comma-separated categories).
    pub fn generate_tagged(&self, tag: &str, content: &str, labels: &[String]) -> Result<String> {
        let result = match tag {
            "no_detection" => FrameResult::NoDetection,
            "single_focus" => FrameResult::SingleFocus {
                item: content.to_string(),
            },
            "category_summary" => FrameResult::CategorySummary {
                categories: content
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect(),
            },
            other => return Err(PipelineError::UnreachableVariant(other.to_string()).into()),
        };
        Ok(self.generate(&result, labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_detection_asks_to_point_the_camera() {
        let msg = MessageGenerator::new().generate(&FrameResult::NoDetection, &[]);
        assert_eq!(msg, "Silakan arahkan kamera ke bahan makanan");
    }

    #[test]
    fn generic_item_phrase() {
        let msg = MessageGenerator::new().generate(
            &FrameResult::SingleFocus {
                item: "paprika".to_string(),
            },
            &labels(&["paprika"]),
        );
        assert_eq!(msg, "Terlihat paprika di depan Anda");
    }

    #[test]
    fn priority_item_in_frame_takes_over() {
        let msg = MessageGenerator::new().generate(
            &FrameResult::SingleFocus {
                item: "paprika".to_string(),
            },
            &labels(&["paprika", "kentang", "wortel"]),
        );
        assert_eq!(msg, "Terlihat wortel di depan Anda");
    }

    #[test]
    fn category_summary_joins_with_commas() {
        let msg = MessageGenerator::new().generate(
            &FrameResult::CategorySummary {
                categories: labels(&["sayuran", "seafood"]),
            },
            &[],
        );
        assert_eq!(msg, "Terlihat beberapa jenis bahan makanan: sayuran, seafood");
    }

    #[test]
    fn empty_summary_is_still_a_sentence() {
        let msg = MessageGenerator::new()
            .generate(&FrameResult::CategorySummary { categories: vec![] }, &[]);
        assert_eq!(msg, "Terlihat beberapa jenis bahan makanan: ");
    }

    #[test]
    fn tagged_generation_matches_variants() {
        let gen = MessageGenerator::new();
        assert_eq!(
            gen.generate_tagged("category_summary", "daging, buah", &[])
                .unwrap(),
            "Terlihat beberapa jenis bahan makanan: daging, buah"
        );
        assert_eq!(
            gen.generate_tagged("single_focus", "tomat", &labels(&["tomat"]))
                .unwrap(),
            "Terlihat tomat di depan Anda"
        );
    }

    #[test]
    fn unknown_tag_is_a_logic_error() {
        let err = MessageGenerator::new()
            .generate_tagged("multiple_same", "", &[])
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<PipelineError>(),
            Some(&PipelineError::UnreachableVariant("multiple_same".to_string()))
        );
    }
}
