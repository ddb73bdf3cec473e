//! Wire messages exchanged with a QZ Tray compatible broker.
//! 與 QZ Tray 相容代理程式交換的訊息格式。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tagsheet_printing::{PrintDocument, PrinterProfile};

/// Opening message carrying the client certificate.
#[derive(Debug, Serialize)]
pub struct Hello<'a> {
    pub certificate: &'a str,
    pub uid: &'a str,
    pub timestamp: u64,
}

/// Answer to a broker challenge.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse<'a> {
    pub uid: &'a str,
    pub signature: &'a str,
    pub sign_algorithm: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterRef {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaSize {
    pub width: f64,
    pub height: f64,
}

/// Print options sent with every job; only size and orientation vary.
/// 每筆工作附帶的列印選項；僅尺寸與方向會變動。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOptions {
    pub size: MediaSize,
    pub units: String,
    pub margins: u32,
    pub scale_content: bool,
    pub rasterize: bool,
    pub density: u32,
    pub orientation: String,
    pub color_type: String,
    pub copies: u32,
}

impl PrintOptions {
    pub fn for_profile(profile: &PrinterProfile) -> Self {
        Self {
            size: MediaSize {
                width: profile.width,
                height: profile.height,
            },
            units: "mm".to_string(),
            margins: 0,
            scale_content: false,
            rasterize: false,
            density: 203,
            orientation: profile.orientation.as_str().to_string(),
            color_type: "color".to_string(),
            copies: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintData {
    #[serde(rename = "type")]
    pub kind: String,
    pub format: String,
    pub flavor: String,
    pub data: String,
}

impl PrintData {
    pub fn pdf_base64(data: String) -> Self {
        Self {
            kind: "pixel".to_string(),
            format: "pdf".to_string(),
            flavor: "base64".to_string(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintParams {
    pub printer: PrinterRef,
    pub options: PrintOptions,
    pub data: Vec<PrintData>,
}

impl PrintParams {
    /// One PDF payload addressed to the printer named by `profile`.
    pub fn new(document: &PrintDocument, profile: &PrinterProfile) -> Self {
        Self {
            printer: PrinterRef {
                name: profile.name.clone(),
            },
            options: PrintOptions::for_profile(profile),
            data: vec![PrintData::pdf_base64(document.to_base64())],
        }
    }
}

#[derive(Debug, Serialize)]
struct SignedFields<'a> {
    call: &'a str,
    params: &'a PrintParams,
    timestamp: u64,
}

/// Hex SHA-256 of the `{call, params, timestamp}` JSON; this is what gets signed.
/// `{call, params, timestamp}` JSON 的 SHA-256 十六進位摘要，即簽章內容。
pub fn call_digest(
    call: &str,
    params: &PrintParams,
    timestamp: u64,
) -> Result<String, serde_json::Error> {
    let payload = serde_json::to_vec(&SignedFields {
        call,
        params,
        timestamp,
    })?;
    Ok(format!("{:x}", Sha256::digest(&payload)))
}

/// A signed `print` call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedCall<'a> {
    pub call: &'a str,
    pub params: &'a PrintParams,
    pub uid: &'a str,
    pub timestamp: u64,
    pub signature: String,
    pub sign_algorithm: &'a str,
}

#[derive(Debug, Deserialize)]
struct RawReply {
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    challenge: Option<String>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
}

/// Broker reply, classified by the field it carries.
/// 依內容欄位分類的代理程式回覆。
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Challenge(String),
    Result(Value),
    Error(String),
}

/// Parses a reply, returning its uid (when present) and classification.
pub fn parse_reply(text: &str) -> Result<(Option<String>, Reply), serde_json::Error> {
    let raw: RawReply = serde_json::from_str(text)?;
    let reply = if let Some(error) = raw.error {
        Reply::Error(match error {
            Value::String(message) => message,
            other => other.to_string(),
        })
    } else if let Some(challenge) = raw.challenge {
        Reply::Challenge(challenge)
    } else {
        Reply::Result(raw.result.unwrap_or(Value::Null))
    };
    Ok((raw.uid, reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagsheet_printing::Orientation;

    fn params() -> PrintParams {
        PrintParams {
            printer: PrinterRef {
                name: "Zebra ZD421".into(),
            },
            options: PrintOptions::for_profile(&PrinterProfile::new(
                "Zebra ZD421",
                50.0,
                30.0,
                Orientation::Landscape,
            )),
            data: vec![PrintData::pdf_base64("JVBERi0=".into())],
        }
    }

    #[test]
    fn options_match_the_fixed_job_contract() {
        let value = serde_json::to_value(params()).unwrap();
        let options = &value["options"];
        assert_eq!(options["size"]["width"], 50.0);
        assert_eq!(options["units"], "mm");
        assert_eq!(options["scaleContent"], false);
        assert_eq!(options["rasterize"], false);
        assert_eq!(options["density"], 203);
        assert_eq!(options["orientation"], "landscape");
        assert_eq!(options["colorType"], "color");
        assert_eq!(value["data"][0]["type"], "pixel");
        assert_eq!(value["data"][0]["format"], "pdf");
        assert_eq!(value["printer"]["name"], "Zebra ZD421");
    }

    #[test]
    fn digest_covers_call_params_and_timestamp() {
        let params = params();
        let digest = call_digest("print", &params, 1_700_000_000_000).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_ne!(
            digest,
            call_digest("print", &params, 1_700_000_000_001).unwrap()
        );
    }

    #[test]
    fn replies_are_classified() {
        assert_eq!(
            parse_reply(r#"{"uid":"a1","challenge":"abc"}"#).unwrap(),
            (Some("a1".into()), Reply::Challenge("abc".into()))
        );
        assert_eq!(
            parse_reply(r#"{"uid":"a1","error":"Printer 'X' not found"}"#).unwrap(),
            (Some("a1".into()), Reply::Error("Printer 'X' not found".into()))
        );
        assert_eq!(
            parse_reply(r#"{"uid":"a1","result":null}"#).unwrap().1,
            Reply::Result(Value::Null)
        );
        assert!(parse_reply("not json").is_err());
    }
}
