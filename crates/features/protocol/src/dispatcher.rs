use crate::envelope::{Envelope, coerce_int};
use crate::error::ProtocolError;
use pvault_auth::{Authorizer, Credentials};
use pvault_domain::constants::{
    CAPABILITY_LICENSE, ErrorCode, PROTOCOL_VERSION, SERVER_VERSION, STATUS_NOT_FOUND, STATUS_OK,
    VENDOR,
};
use pvault_vault::{Lookup, VaultService};
use serde_json::{Map, Value, json};
use tracing::{debug, error, instrument};

/// What the transport hands over for one request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct InboundRequest {
    /// The `json` form field.
    pub json: Option<String>,
    pub form_sid: Option<String>,
    pub form_spwd: Option<String>,
    /// Resolved caller address, empty when unknown.
    pub client_ip: String,
}

impl std::fmt::Debug for InboundRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundRequest")
            .field("form_sid", &self.form_sid)
            .field("client_ip", &self.client_ip)
            .finish_non_exhaustive()
    }
}

/// Response body plus the HTTP status class it travels with.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub http_status: u16,
    pub body: Value,
}

impl Reply {
    fn success(mut fields: Map<String, Value>) -> Self {
        fields.insert("status".to_owned(), STATUS_OK.into());
        Self { http_status: 200, body: Value::Object(fields) }
    }

    fn failure(err: &ProtocolError) -> Self {
        let code = err.code();
        Self {
            http_status: code.http_status(),
            body: json!({
                "status": code.status(),
                "code": code.code(),
                "desc": err.public_message(),
                "version": SERVER_VERSION,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Check,
    Add,
    Publish,
    Update,
    Delete,
    Get,
    GetPublished,
    Search,
}

impl Operation {
    fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "check" => Self::Check,
            "add" => Self::Add,
            "publish" => Self::Publish,
            "update" => Self::Update,
            "delete" => Self::Delete,
            "get" => Self::Get,
            "getpublished" => Self::GetPublished,
            "search" => Self::Search,
            _ => return None,
        })
    }

    const fn needs_credentials(self) -> bool {
        !matches!(self, Self::Check | Self::GetPublished)
    }
}

/// Routes envelopes to the vault operations.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    auth: Authorizer,
    vault: VaultService,
}

impl Dispatcher {
    #[must_use]
    pub const fn new(auth: Authorizer, vault: VaultService) -> Self {
        Self { auth, vault }
    }

    /// Handles one request. Failures become error replies, never panics or transport errors.
    #[instrument(skip_all, fields(ip = %request.client_ip))]
    pub async fn dispatch(&self, request: &InboundRequest) -> Reply {
        let reply = match self.handle(request).await {
            Ok(fields) => Reply::success(fields),
            Err(err) => {
                if err.code() == ErrorCode::InternalError {
                    error!(error = %err, "Request failed");
                } else {
                    debug!(error = %err, "Request rejected");
                }
                Reply::failure(&err)
            }
        };
        debug!(status = reply.http_status, body = %reply.body, "Reply");
        reply
    }

    async fn handle(&self, request: &InboundRequest) -> Result<Map<String, Value>, ProtocolError> {
        let envelope = Envelope::parse(request.json.as_deref())?;
        let version = envelope.int("version");
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::OutdatedVersion { version, context: None });
        }
        debug!(request = %envelope.redacted(), "Request");

        let op = Operation::parse(&envelope.string("op"))
            .ok_or_else(|| ProtocolError::missing("Invalid operation"))?;
        let sid = if op.needs_credentials() {
            let credentials = resolve_credentials(request, &envelope);
            self.auth.authorize(&credentials, &request.client_ip).await?
        } else {
            0
        };

        let uid = envelope.string("uid");
        let mut fields = Map::new();
        match op {
            Operation::Check => return Ok(self.check()),
            Operation::Add => {
                let vid = self
                    .vault
                    .add(sid, envelope.string("data"), envelope.words("words"))
                    .await?;
                fields.insert("vid".to_owned(), vid.into());
            }
            Operation::Publish => {
                let vid = self
                    .vault
                    .publish(sid, envelope.string("data"), envelope.int("duration"))
                    .await?;
                fields.insert("vid".to_owned(), vid.into());
            }
            Operation::Update => {
                self.vault
                    .update(sid, &envelope.string("vid"), envelope.string("data"), envelope.words("words"))
                    .await?;
            }
            Operation::Delete => {
                self.vault.delete(sid, &envelope.string("vid")).await?;
            }
            Operation::Get => {
                let lookups = self.vault.get(sid, &envelope.string("vid")).await?;
                fields.insert("data".to_owned(), lookup_map(lookups));
            }
            Operation::GetPublished => {
                let lookups = self.vault.get_published(&envelope.string("vid")).await?;
                fields.insert("data".to_owned(), lookup_map(lookups));
            }
            Operation::Search => {
                let vids = self.vault.search(sid, envelope.words("words")).await?;
                fields.insert("vids".to_owned(), vids.into());
            }
        }
        fields.insert("uid".to_owned(), uid.into());
        Ok(fields)
    }

    fn check(&self) -> Map<String, Value> {
        let report = self.vault.check();
        let plugins: Vec<Value> = report
            .capabilities
            .names()
            .map(|name| json!({ "name": name, "vendor": VENDOR, "license": CAPABILITY_LICENSE }))
            .collect();

        let mut fields = Map::new();
        fields.insert("time".to_owned(), report.time.into());
        fields.insert("version".to_owned(), report.version.into());
        fields.insert("plugins".to_owned(), plugins.into());
        fields
    }
}

/// Form fields win unless incomplete, then the envelope is consulted.
fn resolve_credentials(request: &InboundRequest, envelope: &Envelope) -> Credentials {
    let sid = request
        .form_sid
        .as_deref()
        .and_then(|sid| coerce_int(&Value::String(sid.to_owned())))
        .unwrap_or_default();
    let form = Credentials::new(sid, request.form_spwd.clone().unwrap_or_default());
    if form.is_complete() {
        form
    } else {
        Credentials::new(envelope.int("sid"), envelope.string("spwd"))
    }
}

fn lookup_map(lookups: Vec<Lookup>) -> Value {
    let data: Map<String, Value> = lookups
        .into_iter()
        .map(|Lookup { vid, payload }| {
            let entry = match payload {
                Some(payload) => json!({ "status": STATUS_OK, "data": payload }),
                None => json!({ "status": STATUS_NOT_FOUND, "data": false }),
            };
            (vid, entry)
        })
        .collect();
    Value::Object(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(sid: Option<&str>, spwd: Option<&str>) -> InboundRequest {
        InboundRequest {
            form_sid: sid.map(str::to_owned),
            form_spwd: spwd.map(str::to_owned),
            ..InboundRequest::default()
        }
    }

    fn envelope(raw: &str) -> Envelope {
        Envelope::parse(Some(raw)).unwrap()
    }

    #[test]
    fn form_credentials_take_precedence() {
        let creds = resolve_credentials(
            &request(Some("4"), Some("form")),
            &envelope(r#"{"sid":9,"spwd":"json"}"#),
        );
        assert_eq!(creds, Credentials::new(4, "form"));
    }

    #[test]
    fn incomplete_form_falls_back_to_envelope() {
        let json = envelope(r#"{"sid":"9","spwd":"json"}"#);
        assert_eq!(resolve_credentials(&request(Some("4"), Some("")), &json), Credentials::new(9, "json"));
        assert_eq!(resolve_credentials(&request(Some("0"), Some("pw")), &json), Credentials::new(9, "json"));
        assert_eq!(resolve_credentials(&request(None, None), &json), Credentials::new(9, "json"));
    }

    #[test]
    fn credential_free_operations() {
        assert!(!Operation::Check.needs_credentials());
        assert!(!Operation::GetPublished.needs_credentials());
        assert!(Operation::Get.needs_credentials());
        assert_eq!(Operation::parse("getpublished"), Some(Operation::GetPublished));
        assert_eq!(Operation::parse("GET"), None);
    }

    #[test]
    fn lookups_render_not_found_as_false() {
        let map = lookup_map(vec![
            Lookup { vid: "a".to_owned(), payload: Some("x".to_owned()) },
            Lookup { vid: "b".to_owned(), payload: None },
        ]);
        assert_eq!(map["a"], json!({ "status": "OK", "data": "x" }));
        assert_eq!(map["b"], json!({ "status": "NOTFOUND", "data": false }));
    }
}
