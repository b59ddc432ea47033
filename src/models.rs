//! Row types of the `scriptures` table.

/// One row of `scriptures`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptureRecord {
    pub id: i64,
    pub scripture_index: String,
    pub fohs_key: String,
    pub fohs: Option<String>,
    pub text: Option<String>,
    pub language_key: Option<String>,
}

impl ScriptureRecord {
    /// Both `text` and `fohs` carry non-blank content.
    pub fn is_complete(&self) -> bool {
        !is_blank(self.text.as_deref()) && !is_blank(self.fohs.as_deref())
    }

    /// Field value by column name, as displayed in CSV exports.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" => Some(self.id.to_string()),
            "scriptureIndex" => Some(self.scripture_index.clone()),
            "fohsKey" => Some(self.fohs_key.clone()),
            "fohs" => self.fohs.clone(),
            "text" => self.text.clone(),
            "languageKey" => self.language_key.clone(),
            _ => None,
        }
    }
}

/// Column names of [`ScriptureRecord`] in table order.
pub const SCRIPTURE_FIELDS: &[&str] = &[
    "id",
    "scriptureIndex",
    "fohsKey",
    "fohs",
    "text",
    "languageKey",
];

/// A row to be inserted; `id` is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewScripture {
    pub scripture_index: String,
    pub fohs_key: String,
    pub fohs: String,
    pub text: String,
}

/// `None`, empty, and whitespace-only values are all blank.
pub fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}
