use crate::error::Error;
use log::debug;
use serde::Deserialize;
use tokio::fs::read_to_string;
use url::Url;

#[derive(Debug, Deserialize)]
pub struct ConfigBuilder {
    database: Database,
    web: Option<WebBuilder>,
    auth: AuthBuilder,
    stream: Option<StreamBuilder>,
    instance: Option<InstanceBuilder>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Database {
    username: String,
    password: String,
    host: String,
    database: String,
    port: u16,
}

#[derive(Debug, Deserialize)]
struct WebBuilder {
    ip: Option<String>,
    port: Option<u16>,
    frontend_url: Option<Url>,
    secure_cookies: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct AuthBuilder {
    token_secret: String,
    token_lifetime_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StreamBuilder {
    api_key: String,
    api_secret: String,
    base_url: Option<Url>,
}

#[derive(Debug, Deserialize)]
struct InstanceBuilder {
    development: Option<bool>,
}

impl ConfigBuilder {
    pub async fn load(path: String) -> Result<Self, Error> {
        debug!("loading config from: {}", path);
        let raw = read_to_string(path).await?;

        let config = toml::from_str(&raw)?;

        Ok(config)
    }

    pub fn build(self) -> Result<Config, Error> {
        let web = if let Some(web) = self.web {
            Web {
                ip: web.ip.unwrap_or(String::from("0.0.0.0")),
                port: web.port.unwrap_or(5002),
                frontend_url: match web.frontend_url {
                    Some(url) => url,
                    None => Url::parse("http://localhost:5173")?,
                },
                secure_cookies: web.secure_cookies.unwrap_or(true),
            }
        } else {
            Web {
                ip: String::from("0.0.0.0"),
                port: 5002,
                frontend_url: Url::parse("http://localhost:5173")?,
                secure_cookies: true,
            }
        };

        if self.auth.token_secret.len() < 32 {
            return Err(Error::ConfigError(
                "auth.token_secret must be at least 32 characters".to_string(),
            ));
        }

        let auth = Auth {
            token_secret: self.auth.token_secret,
            token_lifetime: chrono::Duration::days(self.auth.token_lifetime_days.unwrap_or(7)),
        };

        let stream = match self.stream {
            Some(stream) => Some(Stream {
                api_key: stream.api_key,
                api_secret: stream.api_secret,
                base_url: match stream.base_url {
                    Some(url) => url,
                    None => Url::parse("https://chat.stream-io-api.com")?,
                },
            }),
            None => None,
        };

        let instance = Instance {
            development: self
                .instance
                .and_then(|instance| instance.development)
                .unwrap_or(false),
        };

        Ok(Config {
            database: self.database,
            web,
            auth,
            stream,
            instance,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: Database,
    pub web: Web,
    pub auth: Auth,
    pub stream: Option<Stream>,
    pub instance: Instance,
}

#[derive(Debug, Clone)]
pub struct Web {
    pub ip: String,
    pub port: u16,
    pub frontend_url: Url,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone)]
pub struct Auth {
    pub token_secret: String,
    pub token_lifetime: chrono::Duration,
}

#[derive(Debug, Clone)]
pub struct Stream {
    pub api_key: String,
    pub api_secret: String,
    pub base_url: Url,
}

#[derive(Debug, Clone)]
pub struct Instance {
    pub development: bool,
}

impl Database {
    pub fn url(&self) -> String {
        let mut url = String::from("postgres://");

        url += &self.username;

        if !self.password.is_empty() {
            url += ":";
            url += &self.password;
        }

        url += "@";
        url += &self.host;
        url += ":";
        url += &self.port.to_string();
        url += "/";
        url += &self.database;

        url
    }
}
