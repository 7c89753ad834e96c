// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory ledger, FHEVM instance and wallet for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{address, Address, Bytes, TxHash, B256, U256};
use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::blockchain::{
    AddressBook, DecryptionDomain, Deployment, Eip712Request, Handle, LedgerClientError,
    LinkLedger, OwnedLink, SaveLinkCall, TxReceipt, WalletError, WalletSigner, EMPTY_HANDLE,
};
use crate::environment::Environment;
use crate::fhevm::{
    EncryptedInput, EncryptedInputBuilder, FhevmError, FhevmInstance, FhevmKeypair,
    HandleContractPair,
};
use crate::signature::DecryptionSignature;

pub const CHAIN_ID: u64 = 31337;
pub const OTHER_CHAIN_ID: u64 = 1;
pub const CONTRACT: Address = address!("5fbdb2315678afecb367f032d93f642f64180aa3");

/// Address book with [`CONTRACT`] deployed on [`CHAIN_ID`] only.
pub fn address_book() -> AddressBook {
    let mut book = AddressBook::new();
    book.insert(Deployment {
        address: CONTRACT,
        chain_id: CHAIN_ID,
        chain_name: "hardhat".into(),
    });
    book
}

/// Environment on [`CHAIN_ID`] with `signer` connected.
pub fn connected_environment(signer: Arc<dyn WalletSigner>) -> Arc<Environment> {
    let env = Arc::new(Environment::new(address_book()));
    env.set_chain_id(Some(CHAIN_ID));
    env.set_signer(Some(signer));
    env
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

type Hook = Box<dyn FnOnce() + Send>;

pub struct MockSigner {
    address: Address,
    sign_calls: AtomicUsize,
    reject_next: AtomicBool,
    on_sign: Mutex<Option<Hook>>,
    sign_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl MockSigner {
    pub fn new(seed: u8) -> Self {
        Self {
            address: Address::repeat_byte(seed),
            sign_calls: AtomicUsize::new(0),
            reject_next: AtomicBool::new(false),
            on_sign: Mutex::new(None),
            sign_gate: Mutex::new(None),
        }
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    pub fn reject_next(&self) {
        self.reject_next.store(true, Ordering::SeqCst);
    }

    /// Run `hook` once while the next signature prompt is open.
    pub fn on_sign(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_sign.lock().unwrap() = Some(Box::new(hook));
    }

    /// Keep signature prompts open until a permit is added to the returned semaphore.
    pub fn hold_sign(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.sign_gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl WalletSigner for MockSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_typed_data(&self, _request: &Eip712Request) -> Result<Bytes, WalletError> {
        if self.reject_next.swap(false, Ordering::SeqCst) {
            return Err(WalletError::Rejected("user rejected signing".into()));
        }
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.sign_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| WalletError::Unavailable(e.to_string()))?;
        }
        let hook = self.on_sign.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        Ok(Bytes::from(vec![0x5a; 65]))
    }
}

// ---------------------------------------------------------------------------
// FHEVM
// ---------------------------------------------------------------------------

/// Encrypts by handing out sequential handles and "decrypts" a handle to
/// the integer held in its low eight bytes.
#[derive(Default)]
pub struct MockFhevm {
    keypair_calls: AtomicUsize,
    encrypt_calls: AtomicUsize,
    decrypt_calls: AtomicUsize,
    fail_keypair: AtomicBool,
    fail_decrypt: AtomicBool,
    encrypt_gate: Mutex<Option<Arc<Semaphore>>>,
    on_decrypt: Mutex<Option<Hook>>,
    last_input: Mutex<Option<EncryptedInputBuilder>>,
}

impl MockFhevm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keypair_calls(&self) -> usize {
        self.keypair_calls.load(Ordering::SeqCst)
    }

    pub fn encrypt_calls(&self) -> usize {
        self.encrypt_calls.load(Ordering::SeqCst)
    }

    pub fn decrypt_calls(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    pub fn fail_keypair(&self) {
        self.fail_keypair.store(true, Ordering::SeqCst);
    }

    pub fn fail_decrypt(&self) {
        self.fail_decrypt.store(true, Ordering::SeqCst);
    }

    /// Make `encrypt` wait for a permit on the returned semaphore.
    pub fn hold_encrypt(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.encrypt_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Run `hook` once while the next KMS round trip is in flight.
    pub fn on_decrypt(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_decrypt.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn last_input(&self) -> Option<EncryptedInputBuilder> {
        self.last_input.lock().unwrap().clone()
    }
}

#[async_trait]
impl FhevmInstance for MockFhevm {
    async fn encrypt(&self, input: EncryptedInputBuilder) -> Result<EncryptedInput, FhevmError> {
        let n = self.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.encrypt_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| FhevmError::Encryption(e.to_string()))?;
        }

        let handles = (0..input.values.len())
            .map(|i| {
                let mut handle = B256::from(U256::from(n * 16 + i + 1));
                handle[0] = 0xe1;
                handle
            })
            .collect();
        *self.last_input.lock().unwrap() = Some(input);
        Ok(EncryptedInput {
            handles,
            input_proof: Bytes::from_static(b"proof"),
        })
    }

    fn generate_keypair(&self) -> Result<FhevmKeypair, FhevmError> {
        if self.fail_keypair.load(Ordering::SeqCst) {
            return Err(FhevmError::Keypair("relayer offline".into()));
        }
        let n = self.keypair_calls.fetch_add(1, Ordering::SeqCst) as u8;
        Ok(FhevmKeypair {
            public_key: Bytes::from(vec![0xa0, n]),
            private_key: Bytes::from(vec![0xb0, n]),
        })
    }

    fn decryption_domain(&self) -> DecryptionDomain {
        DecryptionDomain {
            name: "Decryption".into(),
            version: "1".into(),
            chain_id: CHAIN_ID,
            verifying_contract: address!("c6a2dd0d8aef8af3ab10b8d1ab4d7a1f6e2d2e0c"),
        }
    }

    async fn user_decrypt(
        &self,
        pairs: &[HandleContractPair],
        _signature: &DecryptionSignature,
    ) -> Result<HashMap<Handle, U256>, FhevmError> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        let hook = self.on_decrypt.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        if self.fail_decrypt.load(Ordering::SeqCst) {
            return Err(FhevmError::Decryption("KMS timeout".into()));
        }
        Ok(pairs
            .iter()
            .map(|pair| (pair.handle, handle_value(pair.handle)))
            .collect())
    }
}

/// Integer in the low eight bytes of `handle`.
pub fn handle_value(handle: Handle) -> U256 {
    let mut low = [0u8; 8];
    low.copy_from_slice(&handle[24..]);
    U256::from(u64::from_be_bytes(low))
}

/// Count handle the mock ledger issues for `count` links.
pub fn count_handle(count: usize) -> Handle {
    if count == 0 {
        return EMPTY_HANDLE;
    }
    let mut handle = B256::from(U256::from(count));
    handle[0] = 0xc0;
    handle
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LedgerState {
    links: Vec<(Address, OwnedLink)>,
    first_seen: Vec<B256>,
    savers: HashMap<B256, HashSet<Address>>,
    pending: HashMap<TxHash, (Address, B256)>,
    next_tx: u64,
    clock: u64,
}

impl LedgerState {
    fn record(&mut self, owner: Address, url_hash: B256) {
        self.clock += 1;
        self.links.push((
            owner,
            OwnedLink {
                url_hash,
                timestamp: U256::from(1_700_000_000 + self.clock),
            },
        ));
        if !self.first_seen.contains(&url_hash) {
            self.first_seen.push(url_hash);
        }
        self.savers.entry(url_hash).or_default().insert(owner);
    }
}

/// SecureLinks contract semantics over a `Mutex`: the global count of a
/// URL is the number of distinct accounts that saved it.
#[derive(Default)]
pub struct MockLedger {
    state: Mutex<LedgerState>,
    sent: AtomicUsize,
    count_reads: AtomicUsize,
    fail_reads: AtomicBool,
    reject_send: AtomicBool,
    revert_next: AtomicBool,
    last_call: Mutex<Option<SaveLinkCall>>,
    on_confirm: Mutex<Option<Hook>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a link as if `owner` saved `url` earlier.
    pub fn seed(&self, owner: Address, url: &str) {
        self.state
            .lock()
            .unwrap()
            .record(owner, crate::blockchain::text_hash(url));
    }

    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }

    pub fn count_reads(&self) -> usize {
        self.count_reads.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<SaveLinkCall> {
        self.last_call.lock().unwrap().clone()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn reject_send(&self) {
        self.reject_send.store(true, Ordering::SeqCst);
    }

    pub fn revert_next(&self) {
        self.revert_next.store(true, Ordering::SeqCst);
    }

    /// Run `hook` once when the next transaction is confirmed.
    pub fn on_confirm(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_confirm.lock().unwrap() = Some(Box::new(hook));
    }

    fn check_read(&self) -> Result<(), LedgerClientError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerClientError::RpcError("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LinkLedger for MockLedger {
    async fn send_save_link(
        &self,
        _contract: Address,
        from: Address,
        call: &SaveLinkCall,
    ) -> Result<TxHash, LedgerClientError> {
        if self.reject_send.swap(false, Ordering::SeqCst) {
            return Err(LedgerClientError::TransactionFailed(
                "user rejected transaction".into(),
            ));
        }
        self.sent.fetch_add(1, Ordering::SeqCst);
        *self.last_call.lock().unwrap() = Some(call.clone());

        let mut state = self.state.lock().unwrap();
        state.next_tx += 1;
        let tx_hash = TxHash::from(U256::from(state.next_tx));
        state.pending.insert(tx_hash, (from, call.url_hash));
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> Result<TxReceipt, LedgerClientError> {
        let success = !self.revert_next.swap(false, Ordering::SeqCst);
        {
            let mut state = self.state.lock().unwrap();
            let (owner, url_hash) = state
                .pending
                .remove(&tx_hash)
                .ok_or_else(|| LedgerClientError::RpcError("unknown transaction".into()))?;
            if success {
                state.record(owner, url_hash);
            }
        }

        let hook = self.on_confirm.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }

        Ok(TxReceipt {
            tx_hash,
            block_number: 1,
            gas_used: 90_000,
            success,
        })
    }

    async fn get_my_link_count(
        &self,
        _contract: Address,
        caller: Address,
    ) -> Result<Handle, LedgerClientError> {
        self.count_reads.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;
        let state = self.state.lock().unwrap();
        let count = state.links.iter().filter(|(o, _)| *o == caller).count();
        Ok(count_handle(count))
    }

    async fn get_owner_links(
        &self,
        _contract: Address,
        owner: Address,
    ) -> Result<Vec<OwnedLink>, LedgerClientError> {
        self.check_read()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .links
            .iter()
            .filter(|(o, _)| *o == owner)
            .map(|(_, link)| link.clone())
            .collect())
    }

    async fn get_all_links(&self, _contract: Address) -> Result<Vec<B256>, LedgerClientError> {
        self.check_read()?;
        Ok(self.state.lock().unwrap().first_seen.clone())
    }

    async fn get_link_count(
        &self,
        _contract: Address,
        url_hash: B256,
    ) -> Result<U256, LedgerClientError> {
        self.check_read()?;
        let state = self.state.lock().unwrap();
        Ok(U256::from(
            state.savers.get(&url_hash).map_or(0, HashSet::len),
        ))
    }
}
