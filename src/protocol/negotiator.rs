//! Cross-references the client's compression preferences against the
//! lists advertised by the server and emits the capability payload.

use crate::argument::{ArgumentObject, ArgumentValue};
use crate::error::{Error, Result, code};
use crate::protocol::compression::CompressionAlgorithm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionMode {
    #[default]
    Disabled,
    Preferred,
    Required,
}

/// Envelope grouping styles. Negotiated and echoed back to the server,
/// but not otherwise distinguished by the runtime transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionStyle {
    Single,
    Multiple,
    Group,
}

impl CompressionStyle {
    pub fn mysql_name(self) -> &'static str {
        match self {
            Self::Single => "SINGLE",
            Self::Multiple => "MULTIPLE",
            Self::Group => "GROUP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum NegotiationState {
    #[default]
    Unresolved,
    Resolved,
    Failed,
}

/// The negotiation moves once from `Unresolved` to `Resolved` or
/// `Failed`; with mode `Required` a failed negotiation aborts the
/// connection.
#[derive(Debug)]
pub struct CompressionNegotiator {
    /// Client preferences, most preferred first.
    pub algorithms: Vec<CompressionAlgorithm>,
    pub server_styles: Vec<CompressionStyle>,
    pub client_styles: Vec<CompressionStyle>,
    pub mode: CompressionMode,

    server_algorithms: Option<Vec<String>>,
    server_advertised_server_styles: Option<Vec<String>>,
    server_advertised_client_styles: Option<Vec<String>>,

    state: NegotiationState,
    chosen_algorithm: Option<CompressionAlgorithm>,
    chosen_algorithm_name: String,
    chosen_server_style: Option<CompressionStyle>,
    chosen_server_style_name: String,
    chosen_client_style: Option<CompressionStyle>,
    chosen_client_style_name: String,
}

impl Default for CompressionNegotiator {
    fn default() -> Self {
        Self {
            algorithms: vec![
                CompressionAlgorithm::DeflateStream,
                CompressionAlgorithm::Lz4Message,
            ],
            server_styles: vec![
                CompressionStyle::Group,
                CompressionStyle::Multiple,
                CompressionStyle::Single,
            ],
            client_styles: vec![
                CompressionStyle::Single,
                CompressionStyle::Multiple,
                CompressionStyle::Group,
            ],
            mode: CompressionMode::default(),
            server_algorithms: None,
            server_advertised_server_styles: None,
            server_advertised_client_styles: None,
            state: NegotiationState::default(),
            chosen_algorithm: None,
            chosen_algorithm_name: String::new(),
            chosen_server_style: None,
            chosen_server_style_name: String::new(),
            chosen_client_style: None,
            chosen_client_style_name: String::new(),
        }
    }
}

impl CompressionNegotiator {
    pub fn is_negotiation_needed(&self) -> bool {
        self.mode != CompressionMode::Disabled
    }

    pub fn server_supports_algorithms(&mut self, algorithms: Vec<String>) {
        self.server_algorithms = Some(algorithms);
    }

    pub fn server_supports_server_styles(&mut self, styles: Vec<String>) {
        self.server_advertised_server_styles = Some(styles);
    }

    pub fn server_supports_client_styles(&mut self, styles: Vec<String>) {
        self.server_advertised_client_styles = Some(styles);
    }

    pub fn chosen_algorithm(&self) -> Option<CompressionAlgorithm> {
        self.chosen_algorithm
    }

    /// Resolve the agreed tuple and emit the `compression` capability
    /// payload.
    ///
    /// Returns `Ok(None)` when nothing was chosen and the mode allows
    /// proceeding uncompressed; `Err` when the mode is `Required` and the
    /// server offers no acceptable configuration.
    pub fn update_compression_options(
        &mut self,
    ) -> Result<Option<(CompressionAlgorithm, ArgumentValue)>> {
        if self.state == NegotiationState::Unresolved {
            self.resolve();
        }

        if self.state != NegotiationState::Resolved {
            if self.mode == CompressionMode::Required {
                return Err(Error::new(
                    code::REQUIRED_COMPRESSION_NOT_SUPPORTED,
                    "Client's requirement for compression configuration is not supported \
                     by server or it was disabled",
                ));
            }
            return Ok(None);
        }

        let mut payload = ArgumentObject::new();
        payload.insert(
            "algorithm".to_string(),
            ArgumentValue::String(self.chosen_algorithm_name.clone()),
        );
        if self.chosen_client_style.is_some() {
            payload.insert(
                "client_style".to_string(),
                ArgumentValue::String(self.chosen_client_style_name.clone()),
            );
        }
        if self.chosen_server_style.is_some() {
            payload.insert(
                "server_style".to_string(),
                ArgumentValue::String(self.chosen_server_style_name.clone()),
            );
        }

        let algorithm = self.chosen_algorithm.unwrap_or_default();
        Ok(Some((algorithm, ArgumentValue::Object(payload))))
    }

    fn resolve(&mut self) {
        let Some(server_algorithms) = self.server_algorithms.as_deref() else {
            self.state = NegotiationState::Failed;
            return;
        };

        for preferred in &self.algorithms {
            let wanted = preferred.mysql_name();
            if server_algorithms
                .iter()
                .any(|advertised| advertised.eq_ignore_ascii_case(wanted))
            {
                self.chosen_algorithm = Some(*preferred);
                self.chosen_algorithm_name = wanted.to_string();
                break;
            }
        }

        // A style side participates only when the client prefers one and
        // the server advertised a list for it.
        let mut style_failed = false;
        if let Some(advertised) = self.server_advertised_client_styles.as_deref() {
            match first_style_match(&self.client_styles, advertised) {
                Some(style) => {
                    self.chosen_client_style = Some(style);
                    self.chosen_client_style_name = style.mysql_name().to_string();
                }
                None => style_failed = !self.client_styles.is_empty(),
            }
        }
        if let Some(advertised) = self.server_advertised_server_styles.as_deref() {
            match first_style_match(&self.server_styles, advertised) {
                Some(style) => {
                    self.chosen_server_style = Some(style);
                    self.chosen_server_style_name = style.mysql_name().to_string();
                }
                None => style_failed = style_failed || !self.server_styles.is_empty(),
            }
        }

        self.state = if self.chosen_algorithm.is_some() && !style_failed {
            NegotiationState::Resolved
        } else {
            NegotiationState::Failed
        };
    }
}

fn first_style_match(
    preferences: &[CompressionStyle],
    advertised: &[String],
) -> Option<CompressionStyle> {
    preferences
        .iter()
        .find(|style| {
            advertised
                .iter()
                .any(|name| name.eq_ignore_ascii_case(style.mysql_name()))
        })
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_client_preference_wins() {
        let mut negotiator = CompressionNegotiator {
            mode: CompressionMode::Preferred,
            ..CompressionNegotiator::default()
        };
        negotiator.server_supports_algorithms(strings(&["LZ4_MESSAGE"]));

        let (algorithm, _) = negotiator.update_compression_options().unwrap().unwrap();
        assert_eq!(algorithm, CompressionAlgorithm::Lz4Message);
    }

    #[test]
    fn payload_uses_uppercase_wire_names() {
        let mut negotiator = CompressionNegotiator {
            mode: CompressionMode::Required,
            algorithms: vec![CompressionAlgorithm::DeflateStream],
            ..CompressionNegotiator::default()
        };
        negotiator.server_supports_algorithms(strings(&["deflate_stream", "LZ4_MESSAGE"]));

        let (algorithm, payload) = negotiator.update_compression_options().unwrap().unwrap();
        assert_eq!(algorithm, CompressionAlgorithm::DeflateStream);
        let ArgumentValue::Object(object) = payload else {
            panic!("expected object payload");
        };
        assert_eq!(
            object.get("algorithm"),
            Some(&ArgumentValue::String("DEFLATE_STREAM".to_string()))
        );
        assert!(!object.contains_key("client_style"));
        assert!(!object.contains_key("server_style"));
    }

    #[test]
    fn required_mode_with_no_intersection_fails() {
        let mut negotiator = CompressionNegotiator {
            mode: CompressionMode::Required,
            ..CompressionNegotiator::default()
        };
        negotiator.server_supports_algorithms(strings(&[]));

        let err = negotiator.update_compression_options().unwrap_err();
        assert_eq!(err.code, code::REQUIRED_COMPRESSION_NOT_SUPPORTED);
    }

    #[test]
    fn preferred_mode_with_no_intersection_proceeds_uncompressed() {
        let mut negotiator = CompressionNegotiator {
            mode: CompressionMode::Preferred,
            ..CompressionNegotiator::default()
        };
        negotiator.server_supports_algorithms(strings(&["ZSTD_STREAM"]));

        assert!(negotiator.update_compression_options().unwrap().is_none());
    }

    #[test]
    fn styles_are_negotiated_when_advertised() {
        let mut negotiator = CompressionNegotiator {
            mode: CompressionMode::Preferred,
            ..CompressionNegotiator::default()
        };
        negotiator.server_supports_algorithms(strings(&["DEFLATE_STREAM"]));
        negotiator.server_supports_client_styles(strings(&["MULTIPLE", "GROUP"]));
        negotiator.server_supports_server_styles(strings(&["GROUP"]));

        let (_, payload) = negotiator.update_compression_options().unwrap().unwrap();
        let ArgumentValue::Object(object) = payload else {
            panic!("expected object payload");
        };
        // Client prefers SINGLE, MULTIPLE, GROUP; MULTIPLE is the first
        // advertised match. Server side prefers GROUP first.
        assert_eq!(
            object.get("client_style"),
            Some(&ArgumentValue::String("MULTIPLE".to_string()))
        );
        assert_eq!(
            object.get("server_style"),
            Some(&ArgumentValue::String("GROUP".to_string()))
        );
    }
}
