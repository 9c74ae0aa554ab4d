//! Network, contract and pool configuration.
//!
//! Everything here is fixed for the lifetime of a client. The built-in
//! preset targets Unichain Sepolia; a JSON file with the same shape can
//! replace it.

use std::path::Path;
use std::time::Duration;

use alloy::primitives::{
    address,
    aliases::{I24, U24},
    Address, B256,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::abi::PoolKey;
use crate::error::{Error, Result};
use crate::tokens::{Token, TokenDirectory};

// ─── Constants ────────────────────────────────────────────────────────────────

pub const UNICHAIN_SEPOLIA_CHAIN_ID: u64 = 1301;
const UNICHAIN_SEPOLIA_RPC:      &str = "https://sepolia.unichain.org";
const UNICHAIN_SEPOLIA_EXPLORER: &str = "https://unichain-sepolia.blockscout.com";

const HOOK:         Address = address!("0x6145f3Cba8c95A572548e3Cf47C8CEc729CC2888");
const TOKEN_A:      Address = address!("0x4eccff261b376277C521b25aEdC2446239e777Df");
const TOKEN_B:      Address = address!("0x70F648C883566493fbaaD3D329815eABbDE8AB31");
const ROUTER:       Address = address!("0x0ae5F4aFe70f0A9351D8c0fd017183722437eEdf");
const POOL_MANAGER: Address = address!("0x00B036B58a818B1BC34d502D3fE730Db729e62AC");
const FAUCET:       Address = address!("0xE6aFe6a0243609620882C3169546761a9dFB2E2B");

const DEFAULT_DISPLAY_WINDOW_MS: u64 = 5_000;

// ─── Chain descriptor ─────────────────────────────────────────────────────────

/// Native gas currency of a chain, as handed to `wallet_addEthereumChain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name:     String,
    pub symbol:   String,
    pub decimals: u8,
}

/// Fixed descriptor used to verify, switch to, or register the target network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    pub chain_id:        u64,
    pub name:            String,
    pub native_currency: NativeCurrency,
    pub rpc_url:         Url,
    pub explorer_url:    Url,
}

impl ChainDescriptor {
    /// Block-explorer link for a transaction hash.
    pub fn tx_url(&self, hash: B256) -> String {
        format!("{}/tx/{hash}", self.explorer_url.as_str().trim_end_matches('/'))
    }
}

// ─── Contracts / pool ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub router:       Address,
    pub faucet:       Address,
    pub hook:         Address,
    pub pool_manager: Address,
}

/// Static pool parameters; the currencies come from the token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub fee:          u32,
    pub tick_spacing: i32,
}

// ─── SwapConfig ───────────────────────────────────────────────────────────────

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapConfig {
    pub chain:     ChainDescriptor,
    pub contracts: ContractAddresses,
    pub token_a:   Token,
    pub token_b:   Token,
    pub pool:      PoolConfig,
    /// How long a terminal transaction status stays visible. 0 keeps it
    /// until the next intent.
    #[serde(default = "default_display_window_ms")]
    pub display_window_ms: u64,
}

fn default_display_window_ms() -> u64 {
    DEFAULT_DISPLAY_WINDOW_MS
}

impl SwapConfig {
    /// Built-in deployment on Unichain Sepolia.
    pub fn unichain_sepolia() -> Self {
        Self {
            chain: ChainDescriptor {
                chain_id: UNICHAIN_SEPOLIA_CHAIN_ID,
                name:     "Unichain Sepolia".into(),
                native_currency: NativeCurrency {
                    name:     "Ether".into(),
                    symbol:   "ETH".into(),
                    decimals: 18,
                },
                rpc_url:      Url::parse(UNICHAIN_SEPOLIA_RPC).expect("static url"),
                explorer_url: Url::parse(UNICHAIN_SEPOLIA_EXPLORER).expect("static url"),
            },
            contracts: ContractAddresses {
                router:       ROUTER,
                faucet:       FAUCET,
                hook:         HOOK,
                pool_manager: POOL_MANAGER,
            },
            token_a: Token {
                address:  TOKEN_A,
                symbol:   "TKA".into(),
                name:     "Token A".into(),
                decimals: 18,
            },
            token_b: Token {
                address:  TOKEN_B,
                symbol:   "TKB".into(),
                name:     "Token B".into(),
                decimals: 18,
            },
            pool: PoolConfig { fee: 3000, tick_spacing: 60 },
            display_window_ms: DEFAULT_DISPLAY_WINDOW_MS,
        }
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the RPC endpoint, keeping everything else.
    pub fn with_rpc_url(mut self, rpc_url: Url) -> Self {
        self.chain.rpc_url = rpc_url;
        self
    }

    pub fn with_display_window(mut self, window: Duration) -> Self {
        self.display_window_ms = window.as_millis() as u64;
        self
    }

    /// `None` when terminal statuses are kept until the next intent.
    pub fn display_window(&self) -> Option<Duration> {
        (self.display_window_ms > 0).then(|| Duration::from_millis(self.display_window_ms))
    }

    pub fn tokens(&self) -> TokenDirectory {
        TokenDirectory::new(self.token_a.clone(), self.token_b.clone())
    }

    /// The pool's lower-sorted currency.
    pub fn currency0(&self) -> Address {
        self.token_a.address.min(self.token_b.address)
    }

    /// Build the immutable pool key passed into every swap.
    pub fn pool_key(&self) -> Result<PoolKey> {
        let fee = U24::try_from(self.pool.fee)
            .map_err(|_| Error::Config(format!("fee {} does not fit uint24", self.pool.fee)))?;
        let tick_spacing = I24::try_from(self.pool.tick_spacing).map_err(|_| {
            Error::Config(format!("tick spacing {} does not fit int24", self.pool.tick_spacing))
        })?;
        Ok(PoolKey {
            currency0:   self.currency0(),
            currency1:   self.token_a.address.max(self.token_b.address),
            fee,
            tickSpacing: tick_spacing,
            hooks:       self.contracts.hook,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.token_a.address == self.token_b.address {
            return Err(Error::Config("token_a and token_b must differ".into()));
        }
        if self.pool.tick_spacing <= 0 {
            return Err(Error::Config(format!(
                "tick spacing must be positive, got {}",
                self.pool.tick_spacing
            )));
        }
        for (label, addr) in [
            ("router", self.contracts.router),
            ("faucet", self.contracts.faucet),
            ("token_a", self.token_a.address),
            ("token_b", self.token_b.address),
        ] {
            if addr == Address::ZERO {
                return Err(Error::Config(format!("{label} address is zero")));
            }
        }
        self.pool_key().map(|_| ())
    }
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self::unichain_sepolia()
    }
}
