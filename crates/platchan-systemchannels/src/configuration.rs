use serde::{Deserialize, Deserializer, Serialize};

/// Keyboard and behaviour configuration sent with `TextInput.setClient`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default)]
    pub obscure_text: bool,
    #[serde(default = "enabled")]
    pub autocorrect: bool,
    #[serde(default)]
    pub enable_suggestions: bool,
    #[serde(default, rename = "enableIMEPersonalizedLearning")]
    pub enable_ime_personalized_learning: bool,
    #[serde(default)]
    pub enable_delta_model: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text_capitalization: TextCapitalization,
    #[serde(default, deserialize_with = "null_as_default")]
    pub input_type: InputType,
    #[serde(default)]
    pub input_action: Option<TextInputAction>,
    #[serde(default)]
    pub action_label: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content_commit_mime_types: Vec<String>,
    /// Configurations of the other fields in the same autofill group.
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Vec<Configuration>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            obscure_text: false,
            autocorrect: true,
            enable_suggestions: false,
            enable_ime_personalized_learning: false,
            enable_delta_model: false,
            text_capitalization: TextCapitalization::default(),
            input_type: InputType::default(),
            input_action: None,
            action_label: None,
            content_commit_mime_types: Vec::new(),
            fields: Vec::new(),
        }
    }
}

fn enabled() -> bool {
    true
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextCapitalization {
    #[serde(rename = "TextCapitalization.characters")]
    Characters,
    #[serde(rename = "TextCapitalization.words")]
    Words,
    #[serde(rename = "TextCapitalization.sentences")]
    Sentences,
    #[default]
    #[serde(rename = "TextCapitalization.none")]
    None,
}

/// Keyboard layout requested by the field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextInputType {
    #[default]
    #[serde(rename = "TextInputType.text")]
    Text,
    #[serde(rename = "TextInputType.datetime")]
    Datetime,
    #[serde(rename = "TextInputType.name")]
    Name,
    #[serde(rename = "TextInputType.address")]
    PostalAddress,
    #[serde(rename = "TextInputType.number")]
    Number,
    #[serde(rename = "TextInputType.phone")]
    Phone,
    #[serde(rename = "TextInputType.multiline")]
    Multiline,
    #[serde(rename = "TextInputType.emailAddress")]
    EmailAddress,
    #[serde(rename = "TextInputType.url")]
    Url,
    #[serde(rename = "TextInputType.visiblePassword")]
    VisiblePassword,
    #[serde(rename = "TextInputType.none")]
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputType {
    pub name: TextInputType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub signed: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub decimal: bool,
}

/// Action button requested for the keyboard, also reported back through
/// `TextInputClient.performAction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextInputAction {
    #[serde(rename = "TextInputAction.none")]
    None,
    #[serde(rename = "TextInputAction.unspecified")]
    Unspecified,
    #[serde(rename = "TextInputAction.done")]
    Done,
    #[serde(rename = "TextInputAction.go")]
    Go,
    #[serde(rename = "TextInputAction.search")]
    Search,
    #[serde(rename = "TextInputAction.send")]
    Send,
    #[serde(rename = "TextInputAction.next")]
    Next,
    #[serde(rename = "TextInputAction.previous")]
    Previous,
    #[serde(rename = "TextInputAction.continueAction")]
    ContinueAction,
    #[serde(rename = "TextInputAction.join")]
    Join,
    #[serde(rename = "TextInputAction.route")]
    Route,
    #[serde(rename = "TextInputAction.emergencyCall")]
    EmergencyCall,
    #[serde(rename = "TextInputAction.newline")]
    Newline,
    #[serde(rename = "TextInputAction.commitContent")]
    CommitContent,
}

impl TextInputAction {
    /// Encoded name, e.g. `TextInputAction.done`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "TextInputAction.none",
            Self::Unspecified => "TextInputAction.unspecified",
            Self::Done => "TextInputAction.done",
            Self::Go => "TextInputAction.go",
            Self::Search => "TextInputAction.search",
            Self::Send => "TextInputAction.send",
            Self::Next => "TextInputAction.next",
            Self::Previous => "TextInputAction.previous",
            Self::ContinueAction => "TextInputAction.continueAction",
            Self::Join => "TextInputAction.join",
            Self::Route => "TextInputAction.route",
            Self::EmergencyCall => "TextInputAction.emergencyCall",
            Self::Newline => "TextInputAction.newline",
            Self::CommitContent => "TextInputAction.commitContent",
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_full_configuration() {
        let config: Configuration = serde_json::from_value(json!({
            "obscureText": true,
            "autocorrect": false,
            "enableSuggestions": true,
            "enableIMEPersonalizedLearning": true,
            "enableDeltaModel": false,
            "textCapitalization": "TextCapitalization.words",
            "inputType": {"name": "TextInputType.number", "signed": true, "decimal": null},
            "inputAction": "TextInputAction.search",
            "actionLabel": null,
            "contentCommitMimeTypes": ["image/png"],
            "fields": [{"inputType": {"name": "TextInputType.emailAddress"}}]
        }))
        .expect("configuration should decode");

        assert!(config.obscure_text);
        assert!(!config.autocorrect);
        assert!(config.enable_ime_personalized_learning);
        assert_eq!(config.text_capitalization, TextCapitalization::Words);
        assert_eq!(
            config.input_type,
            InputType {
                name: TextInputType::Number,
                signed: true,
                decimal: false,
            }
        );
        assert_eq!(config.input_action, Some(TextInputAction::Search));
        assert_eq!(config.content_commit_mime_types, vec!["image/png".to_string()]);
        assert_eq!(config.fields.len(), 1);
        assert_eq!(config.fields[0].input_type.name, TextInputType::EmailAddress);
        assert!(config.fields[0].autocorrect);
    }

    #[test]
    fn empty_object_uses_defaults() {
        let config: Configuration = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config, Configuration::default());
    }

    #[test]
    fn unknown_enum_name_is_an_error() {
        let err = serde_json::from_value::<Configuration>(json!({
            "inputType": {"name": "TextInputType.hologram"}
        }));
        assert!(err.is_err());
        let err = serde_json::from_value::<Configuration>(json!({
            "textCapitalization": "TextCapitalization.shouting"
        }));
        assert!(err.is_err());
    }

    #[test]
    fn action_names_match_serde() {
        for action in [
            TextInputAction::Done,
            TextInputAction::Unspecified,
            TextInputAction::CommitContent,
            TextInputAction::EmergencyCall,
        ] {
            assert_eq!(serde_json::to_value(action).unwrap(), json!(action.as_str()));
        }
    }
}
