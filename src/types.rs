use serde::Deserialize;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Output style for compiled style sheets (`[styles].output_style`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StyleOutput {
    #[default]
    Expanded,
    Compressed,
}

impl From<StyleOutput> for grass::OutputStyle {
    fn from(style: StyleOutput) -> Self {
        match style {
            StyleOutput::Expanded => grass::OutputStyle::Expanded,
            StyleOutput::Compressed => grass::OutputStyle::Compressed,
        }
    }
}
