/// Bus address for each endpoint. Addresses are deployment configuration,
/// never hard-coded at the call sites.
#[derive(Debug, Clone)]
pub struct BusAddresses {
    pub authentication: String,
    pub describe_user: String,
    pub update_user_info: String,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub table: String,
    /// Secondary index columns ensured at startup; `emails` gets a GIN index,
    /// anything else a plain btree.
    pub indexes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bus: BusAddresses,
    pub store: StoreConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let bus = BusAddresses {
            authentication: std::env::var("AUTH_BUS_ADDRESS")
                .unwrap_or_else(|_| "user.authentication".into()),
            describe_user: std::env::var("DESCRIBE_BUS_ADDRESS")
                .unwrap_or_else(|_| "user.describe".into()),
            update_user_info: std::env::var("UPDATE_BUS_ADDRESS")
                .unwrap_or_else(|_| "user.update_info".into()),
        };
        let store = StoreConfig {
            table: std::env::var("USER_TABLE").unwrap_or_else(|_| "users".into()),
            indexes: std::env::var("USER_INDEXES")
                .unwrap_or_else(|_| "user_name,emails".into())
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        };
        Ok(Self {
            database_url,
            bus,
            store,
        })
    }
}
