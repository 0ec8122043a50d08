/// Server settings, read from the command line or the environment (`.env` included).
#[derive(clap::Parser, Debug, Clone)]
#[command(name = "visual-keras", about = "Layer graph compiler for the visual network editor")]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,

    /// Front-end origin allowed by CORS
    #[arg(long, env = "ALLOWED_ORIGIN", default_value = "http://localhost:3000")]
    pub allowed_origin: String,

    /// Dataset preset used when a request does not name one
    #[arg(long, env = "DEFAULT_DATASET", default_value = "mnist")]
    pub default_dataset: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            allowed_origin: "http://localhost:3000".to_string(),
            default_dataset: "mnist".to_string(),
        }
    }
}
