//! Turns configuration into a ready [`ClientSession`].
//!
//! Without a network, or with the network `embedded`, the session runs against a fresh
//! in-process ledger and provisions every configured account and contract. Any other network is
//! looked up in the registry and reached through its access node, with provisioning off unless
//! asked for. Startup either completes or fails as a whole: no half-provisioned session is ever
//! returned.

use crate::{
    account::{Account, AccountKey},
    address::Address,
    error::Error,
    gateway::{EmbeddedGateway, Gateway, RemoteGateway, SessionGateway},
    imports::ImportResolver,
    keys::{HashAlgorithm, PrivateKey, SignatureAlgorithm},
    registry::{Registry, RegistryError, REGISTRY_FILE, SERVICE_ACCOUNT_NAME},
    session::ClientSession,
    source::{read_source, rooted},
    transaction::DEFAULT_GAS_LIMIT,
};
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    error, fmt,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};


/// Network name selecting the in-process ledger
pub const EMBEDDED_NETWORK: &str = "embedded";
/// Registry network the in-process ledger stands in for
pub const EMULATOR_NETWORK: &str = "emulator";
/// Optional settings file inside the root
pub const SETTINGS_FILE: &str = "Galley.toml";
/// Seed of the in-process ledger's service key when the registry has none
pub const SERVICE_KEY_SEED: &str = "galley-embedded-service-account";
#[allow(missing_docs)]
pub const DEFAULT_LOG_LEVEL: u8 = 3;

#[allow(missing_docs)]
pub const NETWORK_ENV: &str = "GALLEY_NETWORK";
#[allow(missing_docs)]
pub const ROOT_ENV: &str = "GALLEY_ROOT";
#[allow(missing_docs)]
pub const LOG_ENV: &str = "GALLEY_LOG";

/// Startup step that failed
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    LoadingRegistry,
    Connecting,
    ProvisioningAccounts,
    DeployingContracts,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Stage::LoadingRegistry => "loading registry",
            Stage::Connecting => "connecting",
            Stage::ProvisioningAccounts => "provisioning accounts",
            Stage::DeployingContracts => "deploying contracts",
        };
        f.write_str(stage)
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Could not read settings from {path:?}: {source}")]
    Settings {
        path: PathBuf,
        source: Box<dyn error::Error + Send + Sync>,
    },
    #[error("Invalid value {value:?} for {name}")]
    InvalidSetting { name: String, value: String },
    #[error("Bootstrap failed while {stage} for network {network}: {source}")]
    Network {
        stage: Stage,
        network: String,
        source: Box<Error>,
    },
    #[error("Bootstrap failed while {stage} for account {account}: {source}")]
    Account {
        stage: Stage,
        account: String,
        source: Box<Error>,
    },
    #[error("Bootstrap failed while {stage} for contract {contract} of account {account}: {source}")]
    Contract {
        stage: Stage,
        account: String,
        contract: String,
        source: Box<Error>,
    },
    #[error("Account {account} was created at {created} but is configured at {configured}")]
    AddressMismatch {
        account: String,
        created: Address,
        configured: Address,
    },
}

impl BootstrapError {
    /// The stage that failed, when the failure happened during startup
    pub fn stage(&self) -> Option<Stage> {
        match self {
            BootstrapError::Network { stage, .. }
            | BootstrapError::Account { stage, .. }
            | BootstrapError::Contract { stage, .. } => Some(*stage),
            BootstrapError::AddressMismatch { .. } => Some(Stage::ProvisioningAccounts),
            BootstrapError::Settings { .. } | BootstrapError::InvalidSetting { .. } => None,
        }
    }
}

#[allow(missing_docs)]
pub type BootstrapResult<T> = Result<T, BootstrapError>;

/// Contents of `Galley.toml`. Every field is optional.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub network: Option<String>,
    pub in_memory: Option<bool>,
    pub init_accounts: Option<bool>,
    pub deploy_contracts: Option<bool>,
    pub gas_limit: Option<u64>,
    pub hash_algorithm: Option<HashAlgorithm>,
    pub signature_algorithm: Option<SignatureAlgorithm>,
    pub log_level: Option<u8>,
}

pub(crate) async fn read_toml_struct_from_file<Toml: DeserializeOwned>(
    file_path: &Path,
) -> BootstrapResult<Option<Toml>> {
    let settings_error = |source: Box<dyn error::Error + Send + Sync>| BootstrapError::Settings {
        path: file_path.to_path_buf(),
        source,
    };
    if file_path.exists() {
        let contents = fs::read_to_string(file_path)
            .await
            .map_err(|e| settings_error(Box::new(e)))?;
        let toml_struct = toml::from_str(&contents).map_err(|e| settings_error(Box::new(e)))?;
        Ok(Some(toml_struct))
    } else {
        Ok(None)
    }
}

/// Configuration for [`ClientBuilder::start`]
#[derive(Clone, Debug)]
pub struct ClientBuilder {
    network: Option<String>,
    in_memory: Option<bool>,
    init_accounts: Option<bool>,
    deploy_contracts: Option<bool>,
    gas_limit: u64,
    hash_algorithm: HashAlgorithm,
    signature_algorithm: SignatureAlgorithm,
    log_level: u8,
    root: PathBuf,
    registry: Option<Registry>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        ClientBuilder {
            network: None,
            in_memory: None,
            init_accounts: None,
            deploy_contracts: None,
            gas_limit: DEFAULT_GAS_LIMIT,
            hash_algorithm: HashAlgorithm::Sha3_256,
            signature_algorithm: SignatureAlgorithm::EcdsaP256,
            log_level: DEFAULT_LOG_LEVEL,
            root: PathBuf::from("."),
            registry: None,
        }
    }
}

impl ClientBuilder {
    /// Embedded defaults, rooted at the working directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Root from `GALLEY_ROOT`, then `Galley.toml` in that root, then `GALLEY_NETWORK` and
    /// `GALLEY_LOG`
    pub async fn from_env() -> BootstrapResult<Self> {
        Self::from_root(None).await
    }

    /// Like [`ClientBuilder::from_env`], with `root` taking the place of `GALLEY_ROOT` when
    /// given. The environment still overrides `Galley.toml`.
    pub async fn from_root(root: Option<&Path>) -> BootstrapResult<Self> {
        Self::from_lookup(root, |name| std::env::var(name).ok()).await
    }

    pub(crate) async fn from_lookup<F>(root: Option<&Path>, lookup: F) -> BootstrapResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let root = match root {
            Some(root) => root.to_path_buf(),
            None => lookup(ROOT_ENV)
                .filter(|r| !r.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        Self::new()
            .with_root(root)
            .with_settings_file()
            .await?
            .with_env_overrides(lookup)
    }

    /// Apply `Galley.toml` from the root, if there is one
    pub async fn with_settings_file(self) -> BootstrapResult<Self> {
        let path = self.root.join(SETTINGS_FILE);
        match read_toml_struct_from_file::<Settings>(&path).await? {
            Some(settings) => Ok(self.with_settings(settings)),
            None => Ok(self),
        }
    }

    #[allow(missing_docs)]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        if let Some(network) = settings.network {
            self = self.with_network(&network);
        }
        self.in_memory = settings.in_memory.or(self.in_memory);
        self.init_accounts = settings.init_accounts.or(self.init_accounts);
        self.deploy_contracts = settings.deploy_contracts.or(self.deploy_contracts);
        self.gas_limit = settings.gas_limit.unwrap_or(self.gas_limit);
        self.hash_algorithm = settings.hash_algorithm.unwrap_or(self.hash_algorithm);
        self.signature_algorithm = settings
            .signature_algorithm
            .unwrap_or(self.signature_algorithm);
        self.log_level = settings.log_level.unwrap_or(self.log_level);
        self
    }

    pub(crate) fn with_env_overrides<F>(mut self, lookup: F) -> BootstrapResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(network) = lookup(NETWORK_ENV).filter(|n| !n.is_empty()) {
            self = self.with_network(&network);
        }
        if let Some(level) = lookup(LOG_ENV).filter(|l| !l.is_empty()) {
            let level = level
                .parse()
                .map_err(|_| BootstrapError::InvalidSetting {
                    name: LOG_ENV.to_string(),
                    value: level.clone(),
                })?;
            self = self.with_log_level(level);
        }
        Ok(self)
    }

    /// Target network. `embedded` selects the in-process ledger.
    pub fn with_network(mut self, network: &str) -> Self {
        self.network = Some(network.to_string());
        self
    }

    /// Run the in-process ledger in place of the network's access node
    pub fn with_in_memory(mut self, in_memory: bool) -> Self {
        self.in_memory = Some(in_memory);
        self
    }

    /// Create every configured account at startup
    pub fn with_init_accounts(mut self, init_accounts: bool) -> Self {
        self.init_accounts = Some(init_accounts);
        self
    }

    /// Deploy every configured contract at startup
    pub fn with_deploy_contracts(mut self, deploy_contracts: bool) -> Self {
        self.deploy_contracts = Some(deploy_contracts);
        self
    }

    #[allow(missing_docs)]
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    #[allow(missing_docs)]
    pub fn with_hash_algorithm(mut self, hash_algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = hash_algorithm;
        self
    }

    #[allow(missing_docs)]
    pub fn with_signature_algorithm(mut self, signature_algorithm: SignatureAlgorithm) -> Self {
        self.signature_algorithm = signature_algorithm;
        self
    }

    /// 0 is silent, 1 errors, 2 warnings, 3 info, 4 and above debug
    pub fn with_log_level(mut self, log_level: u8) -> Self {
        self.log_level = log_level;
        self
    }

    /// Directory holding `galley.json`, `Galley.toml` and contract sources
    pub fn with_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }

    /// Use this registry instead of reading `galley.json`
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Registry network the session will target
    pub fn network(&self) -> &str {
        match self.network.as_deref() {
            None | Some(EMBEDDED_NETWORK) => EMULATOR_NETWORK,
            Some(network) => network,
        }
    }

    #[allow(missing_docs)]
    pub fn is_in_memory(&self) -> bool {
        let embedded = matches!(self.network.as_deref(), None | Some(EMBEDDED_NETWORK));
        self.in_memory.unwrap_or(embedded)
    }

    #[allow(missing_docs)]
    pub fn init_accounts(&self) -> bool {
        self.init_accounts.unwrap_or_else(|| self.is_in_memory())
    }

    #[allow(missing_docs)]
    pub fn deploy_contracts(&self) -> bool {
        self.deploy_contracts.unwrap_or_else(|| self.is_in_memory())
    }

    #[allow(missing_docs)]
    pub fn log_level(&self) -> u8 {
        self.log_level
    }

    #[allow(missing_docs)]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load, connect, provision, deploy
    pub async fn start(self) -> BootstrapResult<ClientSession> {
        let network = self.network().to_string();
        let in_memory = self.is_in_memory();
        let init_accounts = self.init_accounts();
        let deploy_contracts = self.deploy_contracts();
        info!(%network, in_memory, init_accounts, deploy_contracts, "Bootstrapping client");

        let network_error = |stage: Stage| {
            let network = network.clone();
            move |e: Error| BootstrapError::Network {
                stage,
                network,
                source: Box::new(e),
            }
        };

        let registry = match self.registry {
            Some(registry) => registry,
            None => Registry::load(&self.root.join(REGISTRY_FILE))
                .await
                .map_err(|e| network_error(Stage::LoadingRegistry)(e.into()))?,
        };
        let resolver = ImportResolver::from_registry(&registry, &network)
            .map_err(|e| network_error(Stage::LoadingRegistry)(e.into()))?;

        let (gateway, service) = if in_memory {
            let service_key = embedded_service_key(
                &registry,
                &network,
                self.signature_algorithm,
                self.hash_algorithm,
            )
            .map_err(network_error(Stage::Connecting))?;
            let public_key = service_key
                .private_key(self.signature_algorithm)
                .map_err(|e| network_error(Stage::Connecting)(e.into()))?
                .public_key();
            let ledger = EmbeddedGateway::new(
                public_key,
                service_key.hash_algorithm().unwrap_or(self.hash_algorithm),
            );
            let service = Account::new(ledger.service_address(), service_key);
            (SessionGateway::Embedded(ledger), Some(service))
        } else {
            let host = registry
                .network(&network)
                .map_err(|e| network_error(Stage::Connecting)(e.into()))?;
            let service = match registry.service_account(&network) {
                Ok(service) => Some(service),
                Err(RegistryError::AccountNotFound { .. }) => None,
                Err(e) => return Err(network_error(Stage::Connecting)(e.into())),
            };
            (SessionGateway::Remote(RemoteGateway::new(host)), service)
        };
        let chain_id = gateway
            .ping()
            .await
            .map_err(|e| network_error(Stage::Connecting)(e.into()))?;
        info!(%network, %chain_id, "Connected");

        let session = ClientSession {
            network,
            root: self.root,
            registry,
            gateway,
            resolver,
            service,
            gas_limit: self.gas_limit,
            signature_algorithm: self.signature_algorithm,
            hash_algorithm: self.hash_algorithm,
        };
        if init_accounts {
            provision_accounts(&session).await?;
        }
        if deploy_contracts {
            deploy_contracts_of(&session).await?;
        }
        info!(network = session.network(), "Client ready");
        Ok(session)
    }
}

/// Key the in-process ledger's service account is created with: the registry's own, or one
/// derived from [`SERVICE_KEY_SEED`]
fn embedded_service_key(
    registry: &Registry,
    network: &str,
    signature_algorithm: SignatureAlgorithm,
    hash_algorithm: HashAlgorithm,
) -> Result<AccountKey, Error> {
    match registry.service_account(network) {
        Ok(account) => {
            if let Some(key) = account.key() {
                return Ok(key.clone());
            }
            warn!(%network, "Service account has no key, using the seeded one");
        }
        Err(RegistryError::AccountNotFound { .. }) => {}
        Err(e) => return Err(e.into()),
    }
    let private_key = PrivateKey::from_seed(signature_algorithm, SERVICE_KEY_SEED)?;
    Ok(AccountKey::new(private_key.to_hex().expose_secret())
        .with_signature_algorithm(signature_algorithm)
        .with_hash_algorithm(hash_algorithm))
}

async fn provision_accounts(session: &ClientSession) -> BootstrapResult<()> {
    let stage = Stage::ProvisioningAccounts;
    let accounts = session
        .registry()
        .accounts_sorted(session.network())
        .map_err(|e| BootstrapError::Network {
            stage,
            network: session.network().to_string(),
            source: Box::new(e.into()),
        })?;
    for (name, configured) in accounts {
        if name == SERVICE_ACCOUNT_NAME {
            continue;
        }
        let account_error = |e: Error| BootstrapError::Account {
            stage,
            account: name.clone(),
            source: Box::new(e),
        };
        let key = match configured.key() {
            Some(key) => key.clone(),
            None => {
                warn!(account = %name, "Account has no key, not creating it");
                continue;
            }
        };
        let created = session.create_account(key).await.map_err(account_error)?;
        if created.address() != configured.address() {
            if session.is_embedded() {
                return Err(BootstrapError::AddressMismatch {
                    account: name,
                    created: created.address(),
                    configured: configured.address(),
                });
            }
            warn!(
                account = %name,
                created = %created.address(),
                configured = %configured.address(),
                "Created account does not match the registry"
            );
        }
        info!(account = %name, address = %created.address(), "Provisioned account");
    }
    Ok(())
}

async fn deploy_contracts_of(session: &ClientSession) -> BootstrapResult<()> {
    let stage = Stage::DeployingContracts;
    let network = session.network();
    let accounts = session
        .registry()
        .accounts_sorted(network)
        .map_err(|e| BootstrapError::Network {
            stage,
            network: network.to_string(),
            source: Box::new(e.into()),
        })?;
    for (name, _) in accounts {
        let account_error = |e: Error| BootstrapError::Account {
            stage,
            account: name.clone(),
            source: Box::new(e),
        };
        let contracts = session
            .registry()
            .deployments_for_account(network, &name)
            .map_err(|e| account_error(e.into()))?;
        if contracts.is_empty() {
            continue;
        }
        let account = session.account(&name).map_err(account_error)?;
        for contract in contracts {
            let contract_error = |e: Error| BootstrapError::Contract {
                stage,
                account: name.clone(),
                contract: contract.clone(),
                source: Box::new(e),
            };
            let entry = session
                .registry()
                .contract(&contract)
                .map_err(|e| contract_error(e.into()))?;
            let path = rooted(session.root(), Path::new(&entry.source));
            let code = read_source(&path)
                .await
                .map_err(|e| contract_error(e.into()))?;
            session
                .deploy_contract(&account, &contract, &code)
                .await
                .map_err(contract_error)?;
        }
    }
    Ok(())
}
