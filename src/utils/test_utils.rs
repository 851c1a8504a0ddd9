//! Fixtures shared across the test suites.

#[cfg(test)]
pub mod utils {
    use crate::core::transaction::{Transaction, TIMESTAMP_BACKWARD_MARGIN};
    use crate::crypto::key_pair::PrivateKey;
    use crate::state::{AccountState, StepType, TxGroup, WorldContext};
    use crate::types::address::Address;
    use crate::types::hexint::HexInt;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Key derived from a fixed scalar, for reproducible addresses.
    ///
    /// `seed` must be non-zero (zero is not a valid scalar).
    pub fn deterministic_key(seed: u8) -> PrivateKey {
        PrivateKey::from_bytes(&[seed; 32]).expect("seed must form a valid scalar")
    }

    /// The shared sender key used by pool-level tests.
    pub fn test_key() -> PrivateKey {
        deterministic_key(0xAA)
    }

    /// Address of the shared test sender.
    pub fn test_sender() -> Address {
        test_key().public_key().to_address()
    }

    /// A plain transfer signed by `key`; distinct timestamps give distinct
    /// ids.
    pub fn tx_at(key: &PrivateKey, timestamp: i64) -> Transaction {
        Transaction::new(
            key,
            Address([0xBB; 20]),
            None,
            HexInt::from(100_000i64),
            timestamp,
            None,
            None,
            None,
            None,
        )
        .expect("test transaction must sign")
    }

    /// A plain transfer from the shared test sender.
    ///
    /// With the [`TestWorld`] step schedule it costs exactly 1_000_000.
    pub fn pool_tx(timestamp: i64) -> Transaction {
        tx_at(&test_key(), timestamp)
    }

    #[derive(Default)]
    struct AccountData {
        balance: HexInt,
        contract: bool,
        active: bool,
        owner: Option<Address>,
        methods: Vec<String>,
    }

    /// Account with interior mutability, so `set_balance` works through the
    /// shared trait object the way a real overlay does.
    #[derive(Default)]
    pub struct TestAccount {
        data: Mutex<AccountData>,
    }

    impl AccountState for TestAccount {
        fn balance(&self) -> HexInt {
            self.data.lock().unwrap().balance.clone()
        }

        fn set_balance(&self, value: HexInt) {
            self.data.lock().unwrap().balance = value;
        }

        fn is_contract(&self) -> bool {
            self.data.lock().unwrap().contract
        }

        fn has_active_contract(&self) -> bool {
            let data = self.data.lock().unwrap();
            data.contract && data.active
        }

        fn is_contract_owner(&self, owner: &Address) -> bool {
            self.data.lock().unwrap().owner.as_ref() == Some(owner)
        }

        fn has_api(&self) -> bool {
            self.data.lock().unwrap().contract
        }

        fn accepts_call(&self, method: &str, _params: Option<&Value>) -> bool {
            self.data
                .lock()
                .unwrap()
                .methods
                .iter()
                .any(|m| m == method)
        }
    }

    /// World snapshot with a fixed step schedule:
    /// default step 100, one step per input byte, step price 10.
    pub struct TestWorld {
        block_ts: i64,
        accounts: Mutex<HashMap<Address, Arc<TestAccount>>>,
    }

    impl TestWorld {
        pub fn new(block_ts: i64) -> Self {
            Self {
                block_ts,
                accounts: Mutex::new(HashMap::new()),
            }
        }

        fn account(&self, address: &Address) -> Arc<TestAccount> {
            self.accounts
                .lock()
                .unwrap()
                .entry(*address)
                .or_default()
                .clone()
        }

        /// Sets the account balance outright.
        pub fn fund(&self, address: &Address, amount: u64) {
            self.account(address).set_balance(HexInt::from(amount));
        }

        /// Marks `address` as an active contract owned by `owner` exposing
        /// the given methods.
        pub fn install_contract(&self, address: &Address, owner: Address, methods: &[&str]) {
            let account = self.account(address);
            let mut data = account.data.lock().unwrap();
            data.contract = true;
            data.active = true;
            data.owner = Some(owner);
            data.methods = methods.iter().map(|m| m.to_string()).collect();
        }
    }

    impl WorldContext for TestWorld {
        fn block_timestamp(&self) -> i64 {
            self.block_ts
        }

        fn revision(&self) -> u32 {
            3
        }

        fn steps_for(&self, step_type: StepType, count: i64) -> i64 {
            match step_type {
                StepType::Default => 100 * count,
                StepType::Input => count,
                StepType::ContractCall => 1_000 * count,
            }
        }

        fn step_price(&self) -> HexInt {
            HexInt::from(10i64)
        }

        fn account_state(&self, address: &Address) -> Arc<dyn AccountState> {
            self.account(address)
        }

        fn tx_timestamp_threshold(&self, _group: TxGroup) -> i64 {
            TIMESTAMP_BACKWARD_MARGIN
        }
    }
}
