use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_CONVERTER: &str = "kindlegen";
pub const DEFAULT_OUTPUT_EXTENSION: &str = "mobi";
pub const MAIL_SUBJECT: &str = "From Chrome ToKindle APP";
pub const MAIL_BODY: &str = "From Chrome ToKindle APP";

/// Dedup store settings; present only when both store variables are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSettings {
    /// Provision the database and collection on demand (`CreateDatabase`).
    pub create_database: bool,
    /// Store location (`CosmosDBConnection`): a path or a `file://` URL.
    pub connection: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterSettings {
    pub program: PathBuf,
    pub output_extension: String,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_CONVERTER),
            output_extension: DEFAULT_OUTPUT_EXTENSION.to_string(),
        }
    }
}

/// Delivery settings. Sender and recipient are optional here and checked at delivery time.
#[derive(Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub from: Option<String>,
    pub password: Option<String>,
    pub to: Option<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub subject: String,
    pub body: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            from: None,
            password: None,
            to: None,
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            subject: MAIL_SUBJECT.to_string(),
            body: MAIL_BODY.to_string(),
        }
    }
}

impl fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailSettings")
            .field("from", &self.from)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("to", &self.to)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .finish()
    }
}

/// Process-wide configuration, built once at start-up and handed to each component.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub ledger: Option<LedgerSettings>,
    pub scratch_dir: PathBuf,
    pub converter: ConverterSettings,
    pub mail: MailSettings,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; empty values count as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let ledger = match (get("CreateDatabase"), get("CosmosDBConnection")) {
            (Some(create), Some(connection)) => Some(LedgerSettings {
                create_database: create.trim().eq_ignore_ascii_case("true"),
                connection,
            }),
            _ => None,
        };

        let converter = ConverterSettings {
            program: get("KINDLEGEN_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONVERTER)),
            output_extension: get("CONVERTER_OUTPUT_EXT")
                .map(|ext| ext.trim_start_matches('.').to_string())
                .unwrap_or_else(|| DEFAULT_OUTPUT_EXTENSION.to_string()),
        };

        let mail = MailSettings {
            from: get("emailFrom"),
            password: get("emailFromPass"),
            to: get("emailTo"),
            smtp_host: get("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            smtp_port: get("SMTP_PORT")
                .and_then(|port| port.trim().parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            ..MailSettings::default()
        };

        Self {
            ledger,
            scratch_dir: get("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            converter,
            mail,
        }
    }
}
