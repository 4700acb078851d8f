// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Configuration for the cloud controller.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "veedo-cloud", about = "Cloud-side controller for IoT gateway fleets")]
pub struct CloudConfig {
    /// Server instance id; names the broker event queue.
    #[arg(long, default_value = "iot-cloud-server-1", env = "VEEDO_SERVER_ID")]
    pub server_id: String,

    /// AMQP scheme (amqp or amqps).
    #[arg(long, default_value = "amqp", env = "VEEDO_AMQP_PROTOCOL")]
    pub amqp_protocol: String,

    /// AMQP user.
    #[arg(long, default_value = "guest", env = "VEEDO_AMQP_USER")]
    pub amqp_user: String,

    /// AMQP password.
    #[arg(long, default_value = "guest", env = "VEEDO_AMQP_PASSWORD")]
    pub amqp_password: String,

    /// AMQP broker host.
    #[arg(long, default_value = "127.0.0.1", env = "VEEDO_AMQP_HOST")]
    pub amqp_host: String,

    /// AMQP broker port.
    #[arg(long, default_value_t = 5672, env = "VEEDO_AMQP_PORT")]
    pub amqp_port: u16,

    /// Broker management API port (queue listing at startup).
    #[arg(long, default_value_t = 15672, env = "VEEDO_AMQP_CTL_PORT")]
    pub amqp_ctl_port: u16,

    /// Relational store user.
    #[arg(long, default_value = "veedo", env = "VEEDO_DB_USER")]
    pub db_user: String,

    /// Relational store password.
    #[arg(long, default_value = "", env = "VEEDO_DB_PASSWORD")]
    pub db_password: String,

    /// Relational store host.
    #[arg(long, default_value = "127.0.0.1", env = "VEEDO_DB_HOST")]
    pub db_host: String,

    /// Relational store database name.
    #[arg(long, default_value = "veedo", env = "VEEDO_DB_DATABASE")]
    pub db_database: String,

    /// Relational store port.
    #[arg(long, default_value_t = 3306, env = "VEEDO_DB_PORT")]
    pub db_port: u16,

    /// Per-operation relational store timeout in milliseconds.
    #[arg(long, default_value_t = 5000, env = "VEEDO_DB_TIMEOUT_MS")]
    pub db_timeout_ms: u64,

    /// Time-series store host.
    #[arg(long, default_value = "127.0.0.1", env = "VEEDO_TSDB_HOST")]
    pub tsdb_host: String,

    /// Time-series store port.
    #[arg(long, default_value_t = 8086, env = "VEEDO_TSDB_PORT")]
    pub tsdb_port: u16,

    /// Time-series store user.
    #[arg(long, default_value = "", env = "VEEDO_TSDB_USER")]
    pub tsdb_user: String,

    /// Time-series store password.
    #[arg(long, default_value = "", env = "VEEDO_TSDB_PASSWORD")]
    pub tsdb_password: String,

    /// Media server API user.
    #[arg(long, default_value = "", env = "VEEDO_WOWZA_USER")]
    pub wowza_user: String,

    /// Media server API password.
    #[arg(long, default_value = "", env = "VEEDO_WOWZA_PASSWORD")]
    pub wowza_password: String,

    /// Media server API port.
    #[arg(long, default_value_t = 8087, env = "VEEDO_WOWZA_PORT")]
    pub wowza_port: u16,

    /// Push gateway base URL.
    #[arg(long, default_value = "https://onesignal.com", env = "VEEDO_PUSH_HOST")]
    pub push_host: String,

    /// Push gateway request path.
    #[arg(long, default_value = "/api/v1/notifications", env = "VEEDO_PUSH_REQUEST_URI")]
    pub push_request_uri: String,

    /// Push application id.
    #[arg(long, default_value = "", env = "VEEDO_PUSH_APP_ID")]
    pub push_app_id: String,

    /// Push REST API key (basic auth).
    #[arg(long, default_value = "", env = "VEEDO_PUSH_REST_API_KEY")]
    pub push_rest_api_key: String,

    /// Admin REST port.
    #[arg(long, default_value_t = 8080, env = "VEEDO_REST_PORT")]
    pub rest_port: u16,

    /// Admin REST basic-auth user.
    #[arg(long, default_value = "admin", env = "VEEDO_REST_USER")]
    pub rest_user: String,

    /// Admin REST basic-auth password.
    #[arg(long, default_value = "", env = "VEEDO_REST_PASSWORD")]
    pub rest_password: String,

    /// Gateway RPC timeout in milliseconds.
    #[arg(long, default_value_t = 5000, env = "VEEDO_RPC_TIMEOUT_MS")]
    pub rpc_timeout_ms: u64,

    /// Background task worker count.
    #[arg(long, default_value_t = 8, env = "VEEDO_TASK_WORKERS")]
    pub task_workers: usize,

    /// Background task queue capacity.
    #[arg(long, default_value_t = 1024, env = "VEEDO_TASK_QUEUE")]
    pub task_queue: usize,

    /// Log level when RUST_LOG is unset.
    #[arg(long, default_value = "info", env = "VEEDO_LOG_LEVEL")]
    pub log_level: String,
}

impl CloudConfig {
    pub fn amqp_url(&self) -> String {
        format!(
            "{}://{}:{}@{}:{}/%2f",
            self.amqp_protocol, self.amqp_user, self.amqp_password, self.amqp_host, self.amqp_port
        )
    }

    /// Broker management API base URL (queue listing).
    pub fn amqp_mgmt_url(&self) -> String {
        format!("http://{}:{}", self.amqp_host, self.amqp_ctl_port)
    }

    pub fn db_dsn(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.db_user, self.db_password, self.db_host, self.db_port, self.db_database
        )
    }

    pub fn tsdb_url(&self) -> String {
        format!("http://{}:{}", self.tsdb_host, self.tsdb_port)
    }

    pub fn db_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.db_timeout_ms)
    }

    pub fn rpc_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.rpc_timeout_ms)
    }
}
