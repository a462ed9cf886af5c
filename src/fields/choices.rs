//! Choice lists for dropdown and multiselect fields.

use deunicode::deunicode;
use serde_json::{json, Value as Json};

/// One allowed choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Canonical key stored on the record.
    pub key: String,
    /// Display label.
    pub label: String,
}

/// The allowed values of a choice field.
///
/// Built either from bare labels, whose keys are derived with
/// [`normalize_key`], or from explicit `(key, label)` pairs. Only explicit
/// pairs carry a label mapping; bare choices display their key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choices {
    entries: Vec<Choice>,
    labelled: bool,
}

impl Choices {
    /// Builds choices from display labels.
    ///
    /// ```
    /// use tessera::fields::Choices;
    ///
    /// let choices = Choices::from_labels(["São Paulo", "Rio de Janeiro"]);
    /// assert!(choices.contains("sao_paulo"));
    /// assert!(choices.contains("rio_de_janeiro"));
    /// ```
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = labels
            .into_iter()
            .map(|label| {
                let label = label.into();
                Choice {
                    key: normalize_key(&label),
                    label,
                }
            })
            .collect();
        Self {
            entries,
            labelled: false,
        }
    }

    /// Builds choices from explicit `(key, label)` pairs.
    pub fn from_pairs<I, K, L>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, L)>,
        K: Into<String>,
        L: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(key, label)| Choice {
                key: key.into(),
                label: label.into(),
            })
            .collect();
        Self {
            entries,
            labelled: true,
        }
    }

    /// The canonical keys, in declaration order.
    pub fn possible_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|c| c.key.as_str())
    }

    /// All choices, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Choice> {
        self.entries.iter()
    }

    /// Returns true if `key` is one of the allowed keys.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|c| c.key == key)
    }

    /// Returns true if there are no choices.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of choices.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the choices were given as explicit pairs.
    pub fn is_labelled(&self) -> bool {
        self.labelled
    }

    /// Label shown for `key`.
    ///
    /// Explicit pairs map to their label; bare choices display the key itself.
    pub fn display_label<'a>(&'a self, key: &'a str) -> &'a str {
        if !self.labelled {
            return key;
        }
        self.entries
            .iter()
            .find(|c| c.key == key)
            .map(|c| c.label.as_str())
            .unwrap_or(key)
    }

    /// `{value, label}` object for one key.
    pub fn represent(&self, key: &str) -> Json {
        json!({"value": key, "label": self.display_label(key)})
    }

    /// Option list used in field definitions.
    pub(crate) fn options(&self) -> Json {
        Json::Array(
            self.entries
                .iter()
                .map(|c| json!({"name": c.label, "raw_name": c.label, "value": c.key}))
                .collect(),
        )
    }
}

/// Derives a choice key from a label.
///
/// Accented and other non-ASCII characters are transliterated to ASCII,
/// the result is lowercased and spaces become underscores.
pub fn normalize_key(label: &str) -> String {
    deunicode(label).to_lowercase().replace(' ', "_")
}
