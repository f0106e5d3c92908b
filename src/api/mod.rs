//! Request boundary
//!
//! One dispatcher for both surfaces: the page-facing provider methods
//! (`nock_*`) and the extension-internal `wallet:*` methods. Params are
//! positional JSON arrays; results and errors are JSON values.
//!
//! Internal methods called from page context are refused outright, before
//! any parameter parsing.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{WalletError, WalletResult};
use crate::hardware::manager::{HardwareCredential, SecurityMode};
use crate::hardware::prf::derive_key_from_prf;
use crate::tx::builder::PaymentOutput;
use crate::tx::model::Note;
use crate::vault::{HardwareProof, Vault};
use crate::wallet::address::address_to_public_key;

// Provider methods, callable from any context
pub const METHOD_REQUEST_ACCOUNTS: &str = "nock_requestAccounts";
pub const METHOD_SIGN_MESSAGE: &str = "nock_signMessage";
pub const METHOD_SEND_TRANSACTION: &str = "nock_sendTransaction";

// Internal methods, extension context only
pub const METHOD_GET_STATE: &str = "wallet:getState";
pub const METHOD_UNLOCK: &str = "wallet:unlock";
pub const METHOD_LOCK: &str = "wallet:lock";
pub const METHOD_SETUP: &str = "wallet:setup";
pub const METHOD_SET_AUTO_LOCK: &str = "wallet:setAutoLock";
pub const METHOD_CREATE_ACCOUNT: &str = "wallet:createAccount";
pub const METHOD_SWITCH_ACCOUNT: &str = "wallet:switchAccount";
pub const METHOD_GET_ACCOUNTS: &str = "wallet:getAccounts";
pub const METHOD_RENAME_ACCOUNT: &str = "wallet:renameAccount";
pub const METHOD_GET_MNEMONIC: &str = "wallet:getMnemonic";
pub const METHOD_GET_AUTO_LOCK: &str = "wallet:getAutoLock";

// Hardware protection, extension context only. Registration ceremonies run
// in the popup (WebAuthn needs a window); these methods carry the results
// across, with PRF outputs as positional byte arrays.
pub const METHOD_HW_UNLOCK: &str = "wallet:hwUnlock";
pub const METHOD_HW_GET_STATUS: &str = "wallet:hwGetStatus";
pub const METHOD_HW_GET_CREDENTIALS: &str = "wallet:hwGetCredentials";
pub const METHOD_HW_SAVE_CREDENTIAL: &str = "wallet:hwSaveCredential";
pub const METHOD_HW_REMOVE_CREDENTIAL: &str = "wallet:hwRemoveCredential";
pub const METHOD_HW_ENABLE_VAULT_ENCRYPTION: &str = "wallet:hwEnableVaultEncryption";
pub const METHOD_HW_DISABLE: &str = "wallet:hwDisable";

/// Where a request originates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallContext {
    /// The extension's own UI (popup, options page)
    Extension,
    /// An arbitrary web page talking to the injected provider
    Page,
}

/// One requested transaction output as it crosses the boundary
#[derive(Debug, Deserialize)]
struct OutputRequest {
    /// Recipient as a v0 address
    recipient: String,
    amount: u64,
    #[serde(default)]
    relative_min: Option<u64>,
    #[serde(default)]
    relative_max: Option<u64>,
}

/// Transaction request as it crosses the boundary
#[derive(Debug, Deserialize)]
struct SendTransactionRequest {
    notes: Vec<Note>,
    outputs: Vec<OutputRequest>,
    fee: u64,
}

/// The wallet's request dispatcher
pub struct WalletApi {
    vault: Vault,
}

impl WalletApi {
    pub fn new(vault: Vault) -> Self {
        Self { vault }
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    /// Dispatch one request
    pub fn request(&self, ctx: CallContext, method: &str, params: &Value) -> WalletResult<Value> {
        // Expired sessions lock before the method runs
        self.vault.check_auto_lock()?;

        if is_internal(method) && ctx == CallContext::Page {
            return Err(WalletError::unauthorized(format!(
                "Method {} is not available to pages",
                method
            )));
        }

        match method {
            METHOD_REQUEST_ACCOUNTS => {
                self.vault.record_activity()?;
                let state = self.vault.state()?;
                if state.locked {
                    return Err(WalletError::locked());
                }
                Ok(json!(state.address.into_iter().collect::<Vec<_>>()))
            }
            METHOD_SIGN_MESSAGE => {
                self.vault.record_activity()?;
                let message: String = param(params, 0)?;
                let signature = self.vault.sign_message(message.as_bytes())?;
                Ok(serde_json::to_value(&signature)?)
            }
            METHOD_SEND_TRANSACTION => {
                self.vault.record_activity()?;
                let request: SendTransactionRequest = param(params, 0)?;
                let outputs = request
                    .outputs
                    .iter()
                    .map(|o| {
                        Ok(PaymentOutput {
                            recipient_pubkey: address_to_public_key(&o.recipient)?,
                            amount: o.amount,
                            relative_min: o.relative_min,
                            relative_max: o.relative_max,
                        })
                    })
                    .collect::<WalletResult<Vec<_>>>()?;

                let tx = self
                    .vault
                    .send_transaction(request.notes, outputs, request.fee)?;
                Ok(json!({
                    "txId": tx.tx_id.to_string(),
                    "bytes": STANDARD.encode(&tx.serialized),
                    "totalFees": tx.total_fees,
                }))
            }

            METHOD_GET_STATE => Ok(serde_json::to_value(self.vault.state()?)?),
            METHOD_SETUP => {
                let password: String = param(params, 0)?;
                let state = match opt_param::<String>(params, 1)? {
                    Some(mnemonic) => self.vault.setup_from_mnemonic(&password, &mnemonic)?,
                    None => self.vault.setup(&password)?,
                };
                Ok(serde_json::to_value(state)?)
            }
            METHOD_UNLOCK => {
                let password: String = param(params, 0)?;
                let proof = opt_proof(params, 1)?;
                let state = self.vault.unlock(&password, proof)?;
                Ok(serde_json::to_value(state)?)
            }
            METHOD_LOCK => Ok(serde_json::to_value(self.vault.lock()?)?),
            METHOD_SET_AUTO_LOCK => {
                let minutes: u64 = param(params, 0)?;
                self.vault.set_auto_lock_minutes(minutes)?;
                Ok(Value::Null)
            }
            METHOD_GET_AUTO_LOCK => Ok(json!(self.vault.auto_lock_minutes()?)),
            METHOD_CREATE_ACCOUNT => {
                let name: Option<String> = opt_param(params, 0)?;
                let account = self.vault.create_account(name.as_deref())?;
                Ok(serde_json::to_value(account)?)
            }
            METHOD_SWITCH_ACCOUNT => {
                let index: u32 = param(params, 0)?;
                Ok(serde_json::to_value(self.vault.switch_account(index)?)?)
            }
            METHOD_GET_ACCOUNTS => Ok(serde_json::to_value(self.vault.accounts()?)?),
            METHOD_RENAME_ACCOUNT => {
                let index: u32 = param(params, 0)?;
                let name: String = param(params, 1)?;
                Ok(serde_json::to_value(self.vault.rename_account(index, &name)?)?)
            }
            METHOD_GET_MNEMONIC => {
                let password: String = param(params, 0)?;
                let proof = opt_proof(params, 1)?;
                let phrase = self.vault.get_mnemonic(&password, proof)?;
                Ok(Value::String(phrase.to_string()))
            }

            METHOD_HW_UNLOCK => {
                let output = prf_output(param(params, 0)?)?;
                let state = self.vault.unlock_with_hardware(&output)?;
                Ok(serde_json::to_value(state)?)
            }
            METHOD_HW_GET_STATUS => {
                let mode = self.vault.security_mode()?;
                Ok(json!({
                    "enabled": mode != SecurityMode::Disabled,
                    "mode": mode,
                    "credentialCount": self.vault.hardware_credentials()?.len(),
                }))
            }
            METHOD_HW_GET_CREDENTIALS => {
                Ok(serde_json::to_value(self.vault.hardware_credentials()?)?)
            }
            METHOD_HW_SAVE_CREDENTIAL => {
                let credential: HardwareCredential = param(params, 0)?;
                self.vault.save_hardware_credential(credential)?;
                Ok(Value::Null)
            }
            METHOD_HW_REMOVE_CREDENTIAL => {
                let credential_id: String = param(params, 0)?;
                self.vault.remove_hardware_credential(&credential_id)?;
                Ok(Value::Null)
            }
            METHOD_HW_ENABLE_VAULT_ENCRYPTION => {
                let output = prf_output(param(params, 0)?)?;
                self.vault.enable_vault_encryption(&output)?;
                Ok(Value::Null)
            }
            METHOD_HW_DISABLE => {
                let password: String = param(params, 0)?;
                self.vault.disable_hardware(&password)?;
                Ok(Value::Null)
            }

            _ => Err(WalletError::method_not_supported(method)),
        }
    }
}

fn is_internal(method: &str) -> bool {
    method.starts_with("wallet:")
}

/// A PRF output crosses the boundary as an array of byte values
fn prf_output(bytes: Vec<u8>) -> WalletResult<[u8; 32]> {
    bytes
        .try_into()
        .map_err(|_| WalletError::invalid_input("PRF output must be exactly 32 bytes"))
}

/// Optional PRF output at the given position, turned into an unlock proof
fn opt_proof(params: &Value, index: usize) -> WalletResult<Option<HardwareProof>> {
    match opt_param::<Vec<u8>>(params, index)? {
        Some(bytes) => Ok(Some(HardwareProof::WrappingKey(derive_key_from_prf(
            &prf_output(bytes)?,
        )))),
        None => Ok(None),
    }
}

fn param<T: DeserializeOwned>(params: &Value, index: usize) -> WalletResult<T> {
    opt_param(params, index)?.ok_or_else(|| {
        WalletError::invalid_input(format!("Missing parameter at position {}", index))
    })
}

fn opt_param<T: DeserializeOwned>(params: &Value, index: usize) -> WalletResult<Option<T>> {
    match params.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
    }
}
