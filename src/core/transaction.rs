//! Version-3 transaction model: canonical hash, wire codec and validation.
//!
//! A transaction is immutable once constructed. Its identity is the SHA3-256
//! digest of the canonical dotted encoding (`icx_sendTransaction.<field>.
//! <value>...`), which intentionally excludes the signature: the signature is
//! produced over that digest, and verification recovers the signer's address
//! from it.
//!
//! Two derived representations are cached on first use: the id hash and the
//! binary codec bytes. Both are stable for the lifetime of the value.

use crate::core::tx_serializer::serialize_value;
use crate::crypto::key_pair::{PrivateKey, Signature, SIGNATURE_SIZE};
use crate::state::{StepType, WorldContext};
use crate::types::address::Address;
use crate::types::encoding::{Decode, DecodeError, Encode, EncodeSink};
use crate::types::hash::Hash;
use crate::types::hexint::{i64_to_hex, HexInt};
use chaincore_derive::{BinaryCodec, Error};
use num_bigint::BigInt;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;

/// The only transaction version this node accepts.
pub const TRANSACTION_VERSION: u16 = 3;

/// Maximum compact-JSON size of the `data` field, in bytes.
pub const TX_MAX_DATA_SIZE: usize = 512 * 1024;

/// How far a transaction timestamp may lag a baseline, in microseconds.
pub const TIMESTAMP_BACKWARD_MARGIN: i64 = 5 * 60 * 1_000_000;

/// How far ahead of a baseline a timestamp is tolerated before the
/// transaction is flagged as coming from the future, in microseconds.
pub const TIMESTAMP_FORWARD_MARGIN: i64 = 5 * 60 * 1_000_000;

/// Hard upper bound on how far ahead a timestamp may be, in microseconds.
pub const TIMESTAMP_FORWARD_LIMIT: i64 = 10 * 60 * 1_000_000;

/// Protocol revision from which data size is measured as compact JSON
/// length rather than by content.
const REVISION_COMPACT_DATA_SIZE: u32 = 3;

/// Rejection reasons for transactions, from parsing through pre-validation.
///
/// Only [`TxError::NotEnoughBalance`] is transient: the pool keeps such a
/// transaction for the next block. Every other validation error is sticky
/// and drops the entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("malformed transaction bytes")]
    InvalidFormat,
    #[error("unsupported transaction version {0}")]
    InvalidVersion(u16),
    #[error("signature does not match sender")]
    InvalidSignature,
    #[error("transaction value must not be negative")]
    InvalidValue,
    #[error("data size {0} exceeds the limit")]
    InvalidDataSize(usize),
    #[error("malformed data payload")]
    InvalidData,
    #[error("timestamp out of range: base={base} tx={tx}")]
    Timeout { base: i64, tx: i64 },
    #[error("transaction expired: diff={diff_us}us")]
    ExpiredTransaction { diff_us: i64 },
    #[error("transaction timestamp in the future: base={base} tx={tx}")]
    FutureTransaction { base: i64, tx: i64 },
    #[error("step limit {limit} below minimum {min}")]
    NotEnoughStep { limit: String, min: String },
    #[error("balance {balance} below required {required}")]
    NotEnoughBalance { balance: String, required: String },
    #[error("target account is not a contract")]
    NotContractAccount,
    #[error("target contract is not active")]
    NoActiveContract,
    #[error("method or parameters not accepted by contract")]
    InvalidMethod,
    #[error("sender is not allowed to perform this action")]
    AccessDenied,
    #[error("transaction already processed")]
    AlreadyProcessed,
    #[error("transaction network id {actual} does not match {expected}")]
    InvalidNetwork { expected: i64, actual: i64 },
}

impl TxError {
    /// Transient errors leave the transaction in the pool for the next
    /// block; sticky ones drop it with this error attached.
    pub fn is_transient(&self) -> bool {
        matches!(self, TxError::NotEnoughBalance { .. })
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, TxError::ExpiredTransaction { .. })
    }
}

/// Kind of operation carried in the `data` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinaryCodec)]
pub enum DataType {
    /// Contract method invocation; data is `{method, params?}`.
    Call,
    /// Contract deployment; data is `{contentType, content, params?}`.
    Deploy,
    /// Free-form message payload.
    Message,
}

impl DataType {
    /// Canonical tag used in the hash input and the JSON form.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Call => "call",
            DataType::Deploy => "deploy",
            DataType::Message => "message",
        }
    }
}

/// Lazily computed id hash and codec bytes.
///
/// Carries no wire data: the codec treats it as empty so cached state never
/// leaks into the serialized form, mirroring how equality ignores it.
#[derive(Debug, Default)]
struct TxCache {
    hash: OnceLock<Hash>,
    bytes: OnceLock<Vec<u8>>,
}

impl TxCache {
    fn new() -> Self {
        Self::default()
    }
}

impl Clone for TxCache {
    fn clone(&self) -> Self {
        let cache = TxCache::new();
        if let Some(hash) = self.hash.get() {
            let _ = cache.hash.set(*hash);
        }
        if let Some(bytes) = self.bytes.get() {
            let _ = cache.bytes.set(bytes.clone());
        }
        cache
    }
}

impl PartialEq for TxCache {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl Eq for TxCache {}

impl Encode for TxCache {
    fn encode<S: EncodeSink>(&self, _out: &mut S) {}
}

impl Decode for TxCache {
    fn decode(_input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(TxCache::new())
    }
}

/// A version-3 transaction.
#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub struct Transaction {
    /// Transaction format version; only [`TRANSACTION_VERSION`] is valid.
    pub version: u16,
    /// Sender address, must match the signature recovery result.
    pub from: Address,
    /// Recipient account or contract.
    pub to: Address,
    /// Transferred amount; absent means zero.
    pub value: Option<HexInt>,
    /// Maximum steps the sender authorizes.
    pub step_limit: HexInt,
    /// Client-side creation time, microseconds since the epoch.
    pub timestamp: i64,
    /// Network id this transaction is bound to, if any.
    pub nid: Option<i64>,
    /// Optional replay-protection counter.
    pub nonce: Option<HexInt>,
    /// Recoverable signature over the canonical hash.
    pub signature: Signature,
    /// Kind of the data payload.
    pub data_type: Option<DataType>,
    /// Raw JSON payload text.
    pub data: Option<String>,

    cache: TxCache,
}

#[derive(Deserialize)]
struct CallData {
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeployData {
    content_type: Option<String>,
    content: Option<String>,
}

impl Transaction {
    /// Creates and signs a new transaction.
    ///
    /// The sender address is derived from `key`; the signature covers the
    /// canonical hash of all other fields.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: &PrivateKey,
        to: Address,
        value: Option<HexInt>,
        step_limit: HexInt,
        timestamp: i64,
        nid: Option<i64>,
        nonce: Option<HexInt>,
        data_type: Option<DataType>,
        data: Option<String>,
    ) -> Result<Self, TxError> {
        let mut tx = Transaction {
            version: TRANSACTION_VERSION,
            from: key.public_key().to_address(),
            to,
            value,
            step_limit,
            timestamp,
            nid,
            nonce,
            signature: Signature([0u8; SIGNATURE_SIZE]),
            data_type,
            data,
            cache: TxCache::new(),
        };
        let hash = tx.calc_hash()?;
        tx.signature = key
            .sign_recoverable(hash.as_slice())
            .map_err(|_| TxError::InvalidSignature)?;
        let _ = tx.cache.hash.set(hash);
        Ok(tx)
    }

    /// Decodes a transaction from its wire bytes.
    ///
    /// This is the boundary the pool admits transactions through: the bytes
    /// must round-trip, carry the supported version, and hold parseable
    /// data. The original bytes are retained so `bytes()` is stable.
    pub fn parse(bytes: &[u8]) -> Result<Self, TxError> {
        let tx =
            <Transaction as Decode>::from_bytes(bytes).map_err(|_| TxError::InvalidFormat)?;
        if tx.version != TRANSACTION_VERSION {
            return Err(TxError::InvalidVersion(tx.version));
        }
        let hash = tx.calc_hash()?;
        let _ = tx.cache.hash.set(hash);
        let _ = tx.cache.bytes.set(bytes.to_vec());
        Ok(tx)
    }

    /// Transaction id: the canonical hash, cached after first computation.
    pub fn id(&self) -> Hash {
        *self
            .cache
            .hash
            .get_or_init(|| self.calc_hash().unwrap_or(Hash::zero()))
    }

    /// Stable wire bytes of this transaction.
    pub fn bytes(&self) -> &[u8] {
        self.cache.bytes.get_or_init(|| Encode::to_bytes(self))
    }

    pub fn byte_len(&self) -> usize {
        self.bytes().len()
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Checks the network binding. Transactions without an `nid` pass.
    pub fn validate_network(&self, nid: i64) -> Result<(), TxError> {
        match self.nid {
            Some(actual) if actual != nid => Err(TxError::InvalidNetwork {
                expected: nid,
                actual,
            }),
            _ => Ok(()),
        }
    }

    /// Context-free verification.
    ///
    /// Checks version, value sign, data size and shape, the optional
    /// timestamp window against `baseline`, and finally the signature.
    pub fn verify(&self, baseline: Option<i64>) -> Result<(), TxError> {
        if self.version != TRANSACTION_VERSION {
            return Err(TxError::InvalidVersion(self.version));
        }

        if let Some(base) = baseline {
            self.check_timestamp_window(base)?;
        }

        if let Some(value) = &self.value {
            if value.is_negative() {
                return Err(TxError::InvalidValue);
            }
        }

        let size = self.data_size()?;
        if size > TX_MAX_DATA_SIZE {
            return Err(TxError::InvalidDataSize(size));
        }

        match self.data_type {
            Some(DataType::Call) => {
                self.parse_call_data()?;
            }
            Some(DataType::Deploy) => {
                self.parse_deploy_data()?;
                if let Some(value) = &self.value {
                    if value.sign() != 0 {
                        return Err(TxError::InvalidValue);
                    }
                }
            }
            _ => {}
        }

        self.verify_signature()
    }

    /// Stateful pre-validation against a world snapshot.
    ///
    /// With `update`, the sender's balance is debited (and the recipient
    /// credited) in the snapshot overlay so one sender cannot spend the same
    /// balance twice across a candidate list. `check_data` enables the
    /// stricter contract-level checks for call and deploy payloads.
    pub fn pre_validate(
        &self,
        wc: &dyn WorldContext,
        update: bool,
        check_data: bool,
    ) -> Result<(), TxError> {
        self.check_timestamp_window(wc.block_timestamp())?;

        let data_bytes = self.measured_data_bytes(wc.revision())?;
        let min_step = BigInt::from(
            wc.steps_for(StepType::Default, 1) + wc.steps_for(StepType::Input, data_bytes),
        );
        if self.step_limit.big() < &min_step {
            return Err(TxError::NotEnoughStep {
                limit: self.step_limit.to_string(),
                min: HexInt::from(min_step).to_string(),
            });
        }

        let step_price = wc.step_price();
        let mut cost: BigInt = self.step_limit.big() * step_price.big();
        if let Some(value) = &self.value {
            cost += value.big();
        }

        let sender = wc.account_state(&self.from);
        let balance = sender.balance();
        if balance.big() < &cost {
            return Err(TxError::NotEnoughBalance {
                balance: balance.to_string(),
                required: HexInt::from(cost).to_string(),
            });
        }

        if update {
            let recipient = wc.account_state(&self.to);
            let mut credited = recipient.balance().big().clone();
            if let Some(value) = &self.value {
                credited += value.big();
            }
            sender.set_balance(HexInt::from(balance.big() - &cost));
            recipient.set_balance(HexInt::from(credited));
        }

        if check_data {
            self.pre_validate_data(wc)?;
        }
        Ok(())
    }

    /// Contract-level payload checks, gated by pool configuration.
    fn pre_validate_data(&self, wc: &dyn WorldContext) -> Result<(), TxError> {
        match self.data_type {
            Some(DataType::Call) => {
                let target = wc.account_state(&self.to);
                if !target.is_contract() {
                    return Err(TxError::NotContractAccount);
                }
                if !target.has_active_contract() || !target.has_api() {
                    return Err(TxError::NoActiveContract);
                }
                let call = self.parse_call_data()?;
                if !target.accepts_call(&call.method, call.params.as_ref()) {
                    return Err(TxError::InvalidMethod);
                }
            }
            Some(DataType::Deploy) => {
                // A deploy to the system address installs a new contract;
                // anything else is an update and needs ownership.
                if self.to != Address::SYSTEM {
                    let target = wc.account_state(&self.to);
                    if !target.is_contract() {
                        return Err(TxError::NotContractAccount);
                    }
                    if !target.has_active_contract() {
                        return Err(TxError::NoActiveContract);
                    }
                    if !target.is_contract_owner(&self.from) {
                        return Err(TxError::AccessDenied);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Rejects timestamps outside the window around `base` and flags
    /// far-future ones separately.
    fn check_timestamp_window(&self, base: i64) -> Result<(), TxError> {
        if base == 0 {
            return Ok(());
        }
        let diff = self.timestamp - base;
        if diff <= -TIMESTAMP_BACKWARD_MARGIN || diff > TIMESTAMP_FORWARD_LIMIT {
            return Err(TxError::Timeout {
                base,
                tx: self.timestamp,
            });
        }
        if diff > TIMESTAMP_FORWARD_MARGIN {
            return Err(TxError::FutureTransaction {
                base,
                tx: self.timestamp,
            });
        }
        Ok(())
    }

    fn verify_signature(&self) -> Result<(), TxError> {
        let hash = self.id();
        let public = self
            .signature
            .recover(hash.as_slice())
            .map_err(|_| TxError::InvalidSignature)?;
        if public.to_address() == self.from {
            Ok(())
        } else {
            Err(TxError::InvalidSignature)
        }
    }

    fn parse_call_data(&self) -> Result<CallData, TxError> {
        let data = self.data.as_deref().ok_or(TxError::InvalidData)?;
        let call: CallData = serde_json::from_str(data).map_err(|_| TxError::InvalidData)?;
        if call.method.is_empty() {
            return Err(TxError::InvalidData);
        }
        Ok(call)
    }

    fn parse_deploy_data(&self) -> Result<DeployData, TxError> {
        let data = self.data.as_deref().ok_or(TxError::InvalidData)?;
        let deploy: DeployData =
            serde_json::from_str(data).map_err(|_| TxError::InvalidData)?;
        let content_type = deploy.content_type.as_deref().unwrap_or("");
        if content_type.is_empty() {
            return Err(TxError::InvalidData);
        }
        let content = deploy.content.as_deref().ok_or(TxError::InvalidData)?;
        let digits = content.strip_prefix("0x").ok_or(TxError::InvalidData)?;
        if digits.is_empty()
            || digits.len() % 2 != 0
            || !digits.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(TxError::InvalidData);
        }
        Ok(deploy)
    }

    fn data_value(&self) -> Result<Option<Value>, TxError> {
        match self.data.as_deref() {
            None => Ok(None),
            Some("") => Ok(None),
            Some(text) => serde_json::from_str(text)
                .map(Some)
                .map_err(|_| TxError::InvalidData),
        }
    }

    /// Compact JSON length of the data payload, used by the size cap.
    fn data_size(&self) -> Result<usize, TxError> {
        match self.data_value()? {
            None => Ok(0),
            Some(value) => {
                serde_json::to_string(&value)
                    .map(|s| s.len())
                    .map_err(|_| TxError::InvalidData)
            }
        }
    }

    /// Data size in the unit the step schedule charges for.
    ///
    /// Recent revisions charge per compact-JSON byte; older ones use a
    /// content measure where hex strings count as their decoded width.
    fn measured_data_bytes(&self, revision: u32) -> Result<i64, TxError> {
        if revision >= REVISION_COMPACT_DATA_SIZE {
            Ok(self.data_size()? as i64)
        } else {
            match self.data_value()? {
                None => Ok(0),
                Some(value) => Ok(content_byte_count(&value)),
            }
        }
    }

    /// RPC-style JSON projection, with the id included as `txHash`.
    pub fn to_json(&self) -> Result<Value, TxError> {
        let mut map = serde_json::Map::new();
        map.insert("version".into(), Value::String(i64_to_hex(self.version as i64)));
        map.insert("from".into(), Value::String(self.from.to_string()));
        map.insert("to".into(), Value::String(self.to.to_string()));
        map.insert(
            "stepLimit".into(),
            Value::String(self.step_limit.to_string()),
        );
        map.insert(
            "timestamp".into(),
            Value::String(i64_to_hex(self.timestamp)),
        );
        map.insert("signature".into(), Value::String(hex_bytes(&self.signature.0)));
        if let Some(value) = &self.value {
            map.insert("value".into(), Value::String(value.to_string()));
        }
        if let Some(nid) = self.nid {
            map.insert("nid".into(), Value::String(i64_to_hex(nid)));
        }
        if let Some(nonce) = &self.nonce {
            map.insert("nonce".into(), Value::String(nonce.to_string()));
        }
        if let Some(data_type) = &self.data_type {
            map.insert("dataType".into(), Value::String(data_type.as_str().into()));
        }
        if let Some(data) = self.data_value()? {
            map.insert("data".into(), data);
        }
        map.insert("txHash".into(), Value::String(hex_bytes(self.id().as_slice())));
        Ok(Value::Object(map))
    }

    /// Builds the canonical hash input.
    ///
    /// Present fields contribute `.<name>.<value>` segments in fixed
    /// lexicographic field order; absent optionals contribute nothing.
    fn hash_preimage(&self) -> Result<Vec<u8>, TxError> {
        let mut out = Vec::with_capacity(256);
        out.extend_from_slice(b"icx_sendTransaction");

        if let Some(data) = self.data.as_deref() {
            out.extend_from_slice(b".data.");
            if !data.is_empty() {
                let value: Value =
                    serde_json::from_str(data).map_err(|_| TxError::InvalidData)?;
                serialize_value(&value, &mut out);
            }
        }
        if let Some(data_type) = &self.data_type {
            out.extend_from_slice(b".dataType.");
            out.extend_from_slice(data_type.as_str().as_bytes());
        }
        out.extend_from_slice(b".from.");
        out.extend_from_slice(self.from.to_string().as_bytes());
        if let Some(nid) = self.nid {
            out.extend_from_slice(b".nid.");
            out.extend_from_slice(i64_to_hex(nid).as_bytes());
        }
        if let Some(nonce) = &self.nonce {
            out.extend_from_slice(b".nonce.");
            out.extend_from_slice(nonce.to_string().as_bytes());
        }
        out.extend_from_slice(b".stepLimit.");
        out.extend_from_slice(self.step_limit.to_string().as_bytes());
        out.extend_from_slice(b".timestamp.");
        out.extend_from_slice(i64_to_hex(self.timestamp).as_bytes());
        out.extend_from_slice(b".to.");
        out.extend_from_slice(self.to.to_string().as_bytes());
        if let Some(value) = &self.value {
            out.extend_from_slice(b".value.");
            out.extend_from_slice(value.to_string().as_bytes());
        }
        out.extend_from_slice(b".version.");
        out.extend_from_slice(i64_to_hex(self.version as i64).as_bytes());
        Ok(out)
    }

    fn calc_hash(&self) -> Result<Hash, TxError> {
        Ok(Hash::sha3_of(&self.hash_preimage()?))
    }
}

/// Content measure of a JSON value: hex strings count as decoded bytes,
/// other strings as their length, numbers as their minimal signed width,
/// booleans as one byte.
fn content_byte_count(value: &Value) -> i64 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(n) => {
            let v = n
                .as_i64()
                .or_else(|| n.as_u64().map(|u| u as i64))
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0);
            min_i64_width(v) as i64
        }
        Value::String(s) => {
            let digits = s.strip_prefix("0x").unwrap_or(s);
            if digits
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
            {
                ((digits.len() + 1) / 2) as i64
            } else {
                digits.len() as i64
            }
        }
        Value::Array(items) => items.iter().map(content_byte_count).sum(),
        Value::Object(map) => map.values().map(content_byte_count).sum(),
    }
}

/// Length of the minimal big-endian two's-complement encoding of `v`.
fn min_i64_width(v: i64) -> usize {
    let bytes = v.to_be_bytes();
    let fill = if v < 0 { 0xFF } else { 0x00 };
    let mut start = 0;
    while start < 7 && bytes[start] == fill && (bytes[start + 1] ^ fill) & 0x80 == 0 {
        start += 1;
    }
    8 - start
}

fn hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::utils::{deterministic_key, TestWorld};

    fn key() -> PrivateKey {
        deterministic_key(0x11)
    }

    fn addr(fill: u8) -> Address {
        Address([fill; 20])
    }

    fn simple_tx() -> Transaction {
        Transaction::new(
            &key(),
            addr(0xBB),
            Some(HexInt::from(16i64)),
            HexInt::from(100_000i64),
            1504,
            None,
            None,
            None,
            None,
        )
        .unwrap()
    }

    // ==================== Canonical hash ====================

    #[test]
    fn hash_matches_canonical_preimage() {
        let tx = simple_tx();
        let expected = format!(
            "icx_sendTransaction.from.{}.stepLimit.0x186a0.timestamp.0x5e0.to.{}.value.0x10.version.0x3",
            tx.from, tx.to
        );
        assert_eq!(tx.id(), Hash::sha3_of(expected.as_bytes()));
    }

    #[test]
    fn hash_includes_optional_fields_when_present() {
        let tx = Transaction::new(
            &key(),
            addr(0xBB),
            Some(HexInt::from(16i64)),
            HexInt::from(100_000i64),
            1504,
            Some(1),
            Some(HexInt::from(7i64)),
            Some(DataType::Call),
            Some(r#"{"method":"transfer","params":{"to":"hxff"}}"#.to_string()),
        )
        .unwrap();

        let expected = format!(
            "icx_sendTransaction.data.{{method.transfer.params.{{to.hxff}}}}.dataType.call\
             .from.{}.nid.0x1.nonce.0x7.stepLimit.0x186a0.timestamp.0x5e0.to.{}\
             .value.0x10.version.0x3",
            tx.from, tx.to
        );
        assert_eq!(tx.id(), Hash::sha3_of(expected.as_bytes()));
    }

    #[test]
    fn hash_is_deterministic() {
        let tx = simple_tx();
        assert_eq!(tx.id(), tx.id());
        assert_eq!(tx.id(), tx.clone().id());
    }

    #[test]
    fn different_fields_different_hashes() {
        let a = simple_tx();
        let b = Transaction::new(
            &key(),
            addr(0xBB),
            Some(HexInt::from(17i64)),
            HexInt::from(100_000i64),
            1504,
            None,
            None,
            None,
            None,
        )
        .unwrap();
        assert_ne!(a.id(), b.id());
    }

    // ==================== Codec ====================

    #[test]
    fn codec_roundtrip_preserves_hash_and_fields() {
        let tx = Transaction::new(
            &key(),
            addr(0xBB),
            Some(HexInt::from(16i64)),
            HexInt::from(100_000i64),
            1504,
            Some(3),
            Some(HexInt::from(9i64)),
            Some(DataType::Message),
            Some(r#""hello""#.to_string()),
        )
        .unwrap();

        let decoded = Transaction::parse(tx.bytes()).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.id(), tx.id());
        assert_eq!(decoded.bytes(), tx.bytes());
    }

    #[test]
    fn codec_roundtrip_preserves_absent_optionals() {
        let tx = simple_tx();
        let decoded = Transaction::parse(tx.bytes()).unwrap();
        assert_eq!(decoded.nid, None);
        assert_eq!(decoded.nonce, None);
        assert_eq!(decoded.data_type, None);
        assert_eq!(decoded.data, None);
        assert_eq!(decoded.id(), tx.id());
    }

    #[test]
    fn parse_rejects_wrong_version() {
        let mut tx = simple_tx();
        tx.version = 2;
        let bytes = Encode::to_bytes(&tx);
        assert_eq!(
            Transaction::parse(&bytes),
            Err(TxError::InvalidVersion(2))
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(
            Transaction::parse(&[0xFF, 0x01, 0x02]),
            Err(TxError::InvalidFormat)
        );
    }

    // ==================== Verify ====================

    #[test]
    fn verify_accepts_valid_transaction() {
        assert_eq!(simple_tx().verify(None), Ok(()));
    }

    #[test]
    fn verify_rejects_tampered_sender() {
        let mut tx = simple_tx();
        tx.from = addr(0xEE);
        // The cached hash belongs to the original fields; recompute from
        // scratch the way a receiving node would.
        let reparsed = Transaction::parse(&Encode::to_bytes(&tx)).unwrap();
        assert_eq!(reparsed.verify(None), Err(TxError::InvalidSignature));
    }

    #[test]
    fn verify_rejects_negative_value() {
        let mut tx = simple_tx();
        tx.value = Some(HexInt::from(-1i64));
        let reparsed = Transaction::parse(&Encode::to_bytes(&tx)).unwrap();
        assert_eq!(reparsed.verify(None), Err(TxError::InvalidValue));
    }

    #[test]
    fn verify_rejects_oversized_data() {
        let mut tx = simple_tx();
        let body = "a".repeat(TX_MAX_DATA_SIZE + 16);
        tx.data = Some(format!("\"{body}\""));
        let reparsed = Transaction::parse(&Encode::to_bytes(&tx)).unwrap();
        assert!(matches!(
            reparsed.verify(None),
            Err(TxError::InvalidDataSize(_))
        ));
    }

    #[test]
    fn verify_rejects_call_without_method() {
        let tx = Transaction::new(
            &key(),
            addr(0xBB),
            None,
            HexInt::from(100_000i64),
            1504,
            None,
            None,
            Some(DataType::Call),
            Some(r#"{"params":{}}"#.to_string()),
        )
        .unwrap();
        assert_eq!(tx.verify(None), Err(TxError::InvalidData));
    }

    #[test]
    fn verify_rejects_deploy_with_value() {
        let tx = Transaction::new(
            &key(),
            addr(0xBB),
            Some(HexInt::from(1i64)),
            HexInt::from(100_000i64),
            1504,
            None,
            None,
            Some(DataType::Deploy),
            Some(r#"{"contentType":"application/zip","content":"0xdead"}"#.to_string()),
        )
        .unwrap();
        assert_eq!(tx.verify(None), Err(TxError::InvalidValue));
    }

    #[test]
    fn verify_rejects_deploy_without_content() {
        let tx = Transaction::new(
            &key(),
            addr(0xBB),
            None,
            HexInt::from(100_000i64),
            1504,
            None,
            None,
            Some(DataType::Deploy),
            Some(r#"{"contentType":"application/zip"}"#.to_string()),
        )
        .unwrap();
        assert_eq!(tx.verify(None), Err(TxError::InvalidData));
    }

    #[test]
    fn verify_timestamp_window() {
        let base = 1_000_000_000_000i64;

        let near = Transaction::new(
            &key(),
            addr(0xBB),
            None,
            HexInt::from(100_000i64),
            base + 1_000,
            None,
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(near.verify(Some(base)), Ok(()));

        let stale = Transaction::new(
            &key(),
            addr(0xBB),
            None,
            HexInt::from(100_000i64),
            base - TIMESTAMP_BACKWARD_MARGIN,
            None,
            None,
            None,
            None,
        )
        .unwrap();
        assert!(matches!(
            stale.verify(Some(base)),
            Err(TxError::Timeout { .. })
        ));

        let future = Transaction::new(
            &key(),
            addr(0xBB),
            None,
            HexInt::from(100_000i64),
            base + TIMESTAMP_FORWARD_MARGIN + 1,
            None,
            None,
            None,
            None,
        )
        .unwrap();
        assert!(matches!(
            future.verify(Some(base)),
            Err(TxError::FutureTransaction { .. })
        ));

        let too_far = Transaction::new(
            &key(),
            addr(0xBB),
            None,
            HexInt::from(100_000i64),
            base + TIMESTAMP_FORWARD_LIMIT + 1,
            None,
            None,
            None,
            None,
        )
        .unwrap();
        assert!(matches!(
            too_far.verify(Some(base)),
            Err(TxError::Timeout { .. })
        ));
    }

    #[test]
    fn validate_network_checks_nid() {
        let bound = Transaction::new(
            &key(),
            addr(0xBB),
            None,
            HexInt::from(100_000i64),
            1504,
            Some(2),
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(bound.validate_network(2), Ok(()));
        assert!(matches!(
            bound.validate_network(1),
            Err(TxError::InvalidNetwork { .. })
        ));

        let unbound = simple_tx();
        assert_eq!(unbound.validate_network(7), Ok(()));
    }

    // ==================== Pre-validation ====================

    fn world() -> TestWorld {
        TestWorld::new(1504)
    }

    #[test]
    fn pre_validate_requires_minimum_step() {
        let w = world();
        let tx = Transaction::new(
            &key(),
            addr(0xBB),
            None,
            HexInt::from(10i64),
            1504,
            None,
            None,
            None,
            None,
        )
        .unwrap();
        w.fund(&tx.from, 1_000_000_000);
        assert!(matches!(
            tx.pre_validate(&w, false, false),
            Err(TxError::NotEnoughStep { .. })
        ));
    }

    #[test]
    fn pre_validate_requires_balance_for_fee_and_value() {
        let w = world();
        let tx = simple_tx();
        // fee = 100_000 steps * price 10 = 1_000_000, plus value 16.
        w.fund(&tx.from, 1_000_000);
        assert!(matches!(
            tx.pre_validate(&w, false, false),
            Err(TxError::NotEnoughBalance { .. })
        ));

        w.fund(&tx.from, 1_000_016);
        assert_eq!(tx.pre_validate(&w, false, false), Ok(()));
    }

    #[test]
    fn pre_validate_update_debits_overlay() {
        let w = world();
        let tx = simple_tx();
        w.fund(&tx.from, 1_500_000);

        assert_eq!(tx.pre_validate(&w, true, false), Ok(()));
        // Second run sees the debited balance and fails.
        assert!(matches!(
            tx.pre_validate(&w, true, false),
            Err(TxError::NotEnoughBalance { .. })
        ));
    }

    #[test]
    fn pre_validate_update_credits_recipient() {
        let w = world();
        let tx = simple_tx();
        w.fund(&tx.from, 2_000_000);

        assert_eq!(tx.pre_validate(&w, true, false), Ok(()));
        let recipient = w.account_state(&tx.to);
        assert_eq!(recipient.balance(), HexInt::from(16i64));
    }

    #[test]
    fn pre_validate_checks_timestamp_against_block() {
        let w = TestWorld::new(1_000_000_000_000);
        let tx = simple_tx(); // timestamp 1504, far behind the block
        w.fund(&tx.from, u64::MAX);
        assert!(matches!(
            tx.pre_validate(&w, false, false),
            Err(TxError::Timeout { .. })
        ));
    }

    #[test]
    fn pre_validate_call_requires_active_contract() {
        let w = world();
        let tx = Transaction::new(
            &key(),
            addr(0xCC),
            None,
            HexInt::from(100_000i64),
            1504,
            None,
            None,
            Some(DataType::Call),
            Some(r#"{"method":"transfer"}"#.to_string()),
        )
        .unwrap();
        w.fund(&tx.from, 10_000_000);

        assert_eq!(
            tx.pre_validate(&w, false, true),
            Err(TxError::NotContractAccount)
        );

        w.install_contract(&tx.to, tx.from, &["transfer"]);
        assert_eq!(tx.pre_validate(&w, false, true), Ok(()));

        let bad_method = Transaction::new(
            &key(),
            addr(0xCC),
            None,
            HexInt::from(100_000i64),
            1504,
            None,
            None,
            Some(DataType::Call),
            Some(r#"{"method":"mint"}"#.to_string()),
        )
        .unwrap();
        w.fund(&bad_method.from, 10_000_000);
        assert_eq!(
            bad_method.pre_validate(&w, false, true),
            Err(TxError::InvalidMethod)
        );
    }

    #[test]
    fn pre_validate_deploy_update_requires_ownership() {
        let w = world();
        let owner_key = deterministic_key(0x22);
        let owner = owner_key.public_key().to_address();
        let deploy_data = r#"{"contentType":"application/zip","content":"0xdead"}"#;

        w.install_contract(&addr(0xCC), owner, &[]);

        let not_owner = Transaction::new(
            &key(),
            addr(0xCC),
            None,
            HexInt::from(100_000i64),
            1504,
            None,
            None,
            Some(DataType::Deploy),
            Some(deploy_data.to_string()),
        )
        .unwrap();
        w.fund(&not_owner.from, 10_000_000);
        assert_eq!(
            not_owner.pre_validate(&w, false, true),
            Err(TxError::AccessDenied)
        );

        let by_owner = Transaction::new(
            &owner_key,
            addr(0xCC),
            None,
            HexInt::from(100_000i64),
            1504,
            None,
            None,
            Some(DataType::Deploy),
            Some(deploy_data.to_string()),
        )
        .unwrap();
        w.fund(&by_owner.from, 10_000_000);
        assert_eq!(by_owner.pre_validate(&w, false, true), Ok(()));
    }

    // ==================== Data measurement ====================

    #[test]
    fn content_measure_counts_hex_strings_as_bytes() {
        assert_eq!(content_byte_count(&serde_json::json!("0xdead")), 2);
        assert_eq!(content_byte_count(&serde_json::json!("dead")), 2);
        assert_eq!(content_byte_count(&serde_json::json!("hello!")), 6);
        assert_eq!(content_byte_count(&serde_json::json!(true)), 1);
        assert_eq!(content_byte_count(&serde_json::json!(null)), 0);
        assert_eq!(content_byte_count(&serde_json::json!([256, "ff"])), 3);
    }

    #[test]
    fn min_i64_width_is_minimal_twos_complement() {
        assert_eq!(min_i64_width(0), 1);
        assert_eq!(min_i64_width(127), 1);
        assert_eq!(min_i64_width(128), 2);
        assert_eq!(min_i64_width(-128), 1);
        assert_eq!(min_i64_width(-129), 2);
        assert_eq!(min_i64_width(i64::MAX), 8);
        assert_eq!(min_i64_width(i64::MIN), 8);
    }

    // ==================== JSON projection ====================

    #[test]
    fn to_json_includes_present_fields_only() {
        let tx = simple_tx();
        let json = tx.to_json().unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj["version"], "0x3");
        assert_eq!(obj["from"], tx.from.to_string());
        assert_eq!(obj["stepLimit"], "0x186a0");
        assert_eq!(obj["timestamp"], "0x5e0");
        assert_eq!(obj["value"], "0x10");
        assert!(obj.contains_key("txHash"));
        assert!(!obj.contains_key("nid"));
        assert!(!obj.contains_key("nonce"));
        assert!(!obj.contains_key("data"));
    }
}
