// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Append-only transfer ledger backed by redb (pure Rust, ACID).
//!
//! The ledger engine is the only component permitted to mutate account
//! balances. Every mutation runs in a single redb write transaction that
//! covers the balance update, the transfer record append, and all index
//! maintenance; no observer can see one without the others. redb allows
//! exactly one write transaction at a time, so mutations on the same
//! account never interleave their read-modify-write windows.
//!
//! ## Table Layout
//!
//! - `accounts`: account_id → serialized Account
//! - `transfers`: transfer_id → serialized TransferRecord
//! - `account_transfer_index`: composite key (account|!timestamp|transfer_id)
//!   → direction ("debit"|"credit")
//! - `provider_ref_index`: transactionRef → transfer_id of the original
//!   provider operation (idempotency lookups)
//! - `rollback_index`: transactionRef → transfer_id of the rollback record

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use uuid::Uuid;

use crate::models::{Account, TransferKind, TransferRecord};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary account table: account_id → serialized Account (JSON bytes).
const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

/// Append-only transfer records: transfer_id → serialized TransferRecord.
const TRANSFERS: TableDefinition<&str, &[u8]> = TableDefinition::new("transfers");

/// Index: composite key → direction ("debit"|"credit").
/// Key format: `account|!timestamp_be|transfer_id` for descending-time scans.
const ACCOUNT_TX_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("account_transfer_index");

/// Map: provider transactionRef → transfer_id of the original operation.
const PROVIDER_REF_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("provider_ref_index");

/// Map: provider transactionRef → transfer_id of its rollback record.
const ROLLBACK_INDEX: TableDefinition<&str, &str> = TableDefinition::new("rollback_index");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("account already exists: {0}")]
    AccountExists(String),

    #[error("invalid account id: {0}")]
    InvalidAccountId(String),

    #[error("amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("insufficient funds on account {0}")]
    InsufficientFunds(String),

    #[error("transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("transaction already processed: {0}")]
    AlreadyProcessed(String),

    #[error("transaction already rolled back: {0}")]
    AlreadyRolledBack(String),

    #[error("sender and receiver must be distinct accounts")]
    SelfTransfer,
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key for the account_transfer_index table.
///
/// Format: `account_id | inverted_timestamp_be_bytes | transfer_id`
///
/// The inverted timestamp ensures newest-first ordering when scanning forward.
fn make_index_key(account_id: &str, timestamp: i64, transfer_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(account_id.len() + 1 + 8 + 1 + transfer_id.len());
    key.extend_from_slice(account_id.as_bytes());
    key.push(b'|');
    // Invert timestamp for descending order (newest first)
    key.extend_from_slice(&(!timestamp as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(transfer_id.as_bytes());
    key
}

/// Build a prefix key for range scanning all transfers of an account.
fn make_prefix(account_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(account_id.len() + 1);
    prefix.extend_from_slice(account_id.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Build the upper bound for a range scan (prefix with 0xFF bytes appended).
fn make_prefix_end(account_id: &str) -> Vec<u8> {
    let mut end = Vec::with_capacity(account_id.len() + 1 + 20);
    end.extend_from_slice(account_id.as_bytes());
    end.push(b'|');
    end.extend_from_slice(&[0xFF; 20]);
    end
}

/// Extract the transfer_id portion from a composite index key.
fn extract_transfer_id_from_key(key: &[u8]) -> Option<String> {
    let mut pipe_count = 0;
    for (i, &b) in key.iter().enumerate() {
        if b == b'|' {
            pipe_count += 1;
            if pipe_count == 2 {
                return String::from_utf8(key[i + 1..].to_vec()).ok();
            }
        }
    }
    None
}

// =============================================================================
// Cursor Encoding
// =============================================================================

fn encode_cursor(key: &[u8]) -> String {
    hex::encode(key)
}

fn decode_cursor(cursor: &str) -> Option<Vec<u8>> {
    hex::decode(cursor).ok()
}

// =============================================================================
// Read Helpers
// =============================================================================

fn load_account<T>(accounts: &T, account_id: &str) -> LedgerResult<Account>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    match accounts.get(account_id)? {
        Some(raw) => Ok(serde_json::from_slice(raw.value())?),
        None => Err(LedgerError::AccountNotFound(account_id.to_string())),
    }
}

fn load_transfer<T>(transfers: &T, transfer_id: &str) -> LedgerResult<Option<TransferRecord>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    match transfers.get(transfer_id)? {
        Some(raw) => Ok(Some(serde_json::from_slice(raw.value())?)),
        None => Ok(None),
    }
}

/// Look up the original provider operation for a transactionRef, if any.
fn lookup_provider_ref<R, T>(
    refs: &R,
    transfers: &T,
    transaction_ref: &str,
) -> LedgerResult<Option<TransferRecord>>
where
    R: ReadableTable<&'static str, &'static str>,
    T: ReadableTable<&'static str, &'static [u8]>,
{
    match refs.get(transaction_ref)? {
        Some(id) => {
            let transfer_id = id.value().to_string();
            load_transfer(transfers, &transfer_id)
        }
        None => Ok(None),
    }
}

// =============================================================================
// LedgerEngine
// =============================================================================

/// Embedded ACID ledger: accounts plus their append-only transfer history.
pub struct LedgerEngine {
    db: Database,
}

impl LedgerEngine {
    /// Open (or create) the ledger database at the given path.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(TRANSFERS)?;
            let _ = write_txn.open_table(ACCOUNT_TX_INDEX)?;
            let _ = write_txn.open_table(PROVIDER_REF_INDEX)?;
            let _ = write_txn.open_table(ROLLBACK_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Create a new account with an opening balance.
    ///
    /// The account id must be non-empty and must not contain `|`, which is
    /// the field delimiter inside the history index keys.
    pub fn create_account(&self, account_id: &str, initial_balance: i64) -> LedgerResult<Account> {
        if account_id.is_empty() || account_id.contains('|') {
            return Err(LedgerError::InvalidAccountId(account_id.to_string()));
        }
        if initial_balance < 0 {
            return Err(LedgerError::InvalidAmount(initial_balance));
        }

        let account = Account::new(account_id, initial_balance);
        let raw = serde_json::to_vec(&account)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            if accounts.get(account_id)?.is_some() {
                return Err(LedgerError::AccountExists(account_id.to_string()));
            }
            accounts.insert(account_id, raw.as_slice())?;
        }
        write_txn.commit()?;

        tracing::info!(account_id, initial_balance, "account created");
        Ok(account)
    }

    /// Read an account's current committed state.
    pub fn get_account(&self, account_id: &str) -> LedgerResult<Account> {
        let read_txn = self.db.begin_read()?;
        let accounts = read_txn.open_table(ACCOUNTS)?;
        load_account(&accounts, account_id)
    }

    // =========================================================================
    // Operator Operations
    // =========================================================================

    /// Credit an account. Requires `amount > 0`.
    pub fn deposit(
        &self,
        account_id: &str,
        amount: i64,
        note: Option<String>,
    ) -> LedgerResult<TransferRecord> {
        self.apply_single(account_id, amount, TransferKind::Deposit, note)
    }

    /// Debit an account. Requires `amount > 0` and sufficient balance.
    pub fn withdraw(
        &self,
        account_id: &str,
        amount: i64,
        note: Option<String>,
    ) -> LedgerResult<TransferRecord> {
        self.apply_single(account_id, amount, TransferKind::Withdraw, note)
    }

    /// Move funds between two distinct accounts.
    ///
    /// Both balances change and a single record referencing both accounts is
    /// appended, all in one transaction; if either account is missing the
    /// whole operation aborts with no partial effect.
    pub fn transfer(
        &self,
        sender_id: &str,
        receiver_id: &str,
        amount: i64,
        note: Option<String>,
    ) -> LedgerResult<(TransferRecord, Account, Account)> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        if sender_id == receiver_id {
            return Err(LedgerError::SelfTransfer);
        }

        let write_txn = self.db.begin_write()?;
        let result = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let mut transfers = write_txn.open_table(TRANSFERS)?;
            let mut index = write_txn.open_table(ACCOUNT_TX_INDEX)?;

            let mut sender = load_account(&accounts, sender_id)?;
            let mut receiver = load_account(&accounts, receiver_id)?;

            if sender.balance < amount {
                return Err(LedgerError::InsufficientFunds(sender_id.to_string()));
            }

            let receiver_before = receiver.balance;
            let now = Utc::now();
            sender.balance -= amount;
            sender.updated_at = now;
            receiver.balance = receiver
                .balance
                .checked_add(amount)
                .ok_or(LedgerError::InvalidAmount(amount))?;
            receiver.updated_at = now;

            let sender_raw = serde_json::to_vec(&sender)?;
            accounts.insert(sender_id, sender_raw.as_slice())?;
            let receiver_raw = serde_json::to_vec(&receiver)?;
            accounts.insert(receiver_id, receiver_raw.as_slice())?;

            let record = TransferRecord {
                id: Uuid::new_v4().to_string(),
                sender_id: sender_id.to_string(),
                receiver_id: receiver_id.to_string(),
                kind: TransferKind::Deposit,
                amount,
                note,
                transaction_ref: None,
                balance_before: receiver_before,
                balance_after: receiver.balance,
                created_at: now,
            };
            let record_raw = serde_json::to_vec(&record)?;
            transfers.insert(record.id.as_str(), record_raw.as_slice())?;

            let ts = record.created_at.timestamp();
            let sender_key = make_index_key(sender_id, ts, &record.id);
            index.insert(sender_key.as_slice(), "debit")?;
            let receiver_key = make_index_key(receiver_id, ts, &record.id);
            index.insert(receiver_key.as_slice(), "credit")?;

            (record, sender, receiver)
        };
        write_txn.commit()?;

        tracing::info!(
            sender_id,
            receiver_id,
            amount,
            transfer_id = %result.0.id,
            "transfer applied"
        );
        Ok(result)
    }

    // =========================================================================
    // Provider Operations
    // =========================================================================

    /// Provider-initiated debit (wager).
    ///
    /// Idempotent on `transaction_ref`: a replayed call with the same
    /// account, kind, and amount returns the original record without
    /// mutating anything; a replay differing in any of them is
    /// `AlreadyProcessed`.
    pub fn provider_debit(
        &self,
        account_id: &str,
        amount: i64,
        transaction_ref: &str,
    ) -> LedgerResult<TransferRecord> {
        self.apply_provider(account_id, amount, TransferKind::ProviderDebit, transaction_ref)
    }

    /// Provider-initiated credit (win). Same idempotency contract as
    /// [`Self::provider_debit`].
    pub fn provider_credit(
        &self,
        account_id: &str,
        amount: i64,
        transaction_ref: &str,
    ) -> LedgerResult<TransferRecord> {
        self.apply_provider(account_id, amount, TransferKind::ProviderCredit, transaction_ref)
    }

    /// Reverse a previously applied provider debit or credit.
    ///
    /// Fails with `TransactionNotFound` if no operation with this reference
    /// was applied, and with `AlreadyRolledBack` if a rollback for it
    /// already exists.
    pub fn provider_rollback(&self, transaction_ref: &str) -> LedgerResult<TransferRecord> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let mut transfers = write_txn.open_table(TRANSFERS)?;
            let mut index = write_txn.open_table(ACCOUNT_TX_INDEX)?;
            let refs = write_txn.open_table(PROVIDER_REF_INDEX)?;
            let mut rollbacks = write_txn.open_table(ROLLBACK_INDEX)?;

            let original = lookup_provider_ref(&refs, &transfers, transaction_ref)?
                .ok_or_else(|| LedgerError::TransactionNotFound(transaction_ref.to_string()))?;

            if rollbacks.get(transaction_ref)?.is_some() {
                return Err(LedgerError::AlreadyRolledBack(transaction_ref.to_string()));
            }

            // Original provider operations are single-account records.
            let account_id = original.receiver_id.clone();
            let mut account = load_account(&accounts, account_id.as_str())?;
            let before = account.balance;
            let now = Utc::now();

            let (new_balance, direction) = match original.kind {
                // Undo a wager: put the funds back.
                TransferKind::ProviderDebit => (
                    account
                        .balance
                        .checked_add(original.amount)
                        .ok_or(LedgerError::InvalidAmount(original.amount))?,
                    "credit",
                ),
                // Undo a win: take the funds back, never below zero.
                TransferKind::ProviderCredit => {
                    if account.balance < original.amount {
                        return Err(LedgerError::InsufficientFunds(account_id.clone()));
                    }
                    (account.balance - original.amount, "debit")
                }
                _ => {
                    return Err(LedgerError::TransactionNotFound(transaction_ref.to_string()))
                }
            };

            account.balance = new_balance;
            account.updated_at = now;
            let account_raw = serde_json::to_vec(&account)?;
            accounts.insert(account_id.as_str(), account_raw.as_slice())?;

            let record = TransferRecord {
                id: Uuid::new_v4().to_string(),
                sender_id: account_id.clone(),
                receiver_id: account_id.clone(),
                kind: TransferKind::ProviderRollback,
                amount: original.amount,
                note: None,
                transaction_ref: Some(transaction_ref.to_string()),
                balance_before: before,
                balance_after: account.balance,
                created_at: now,
            };
            let record_raw = serde_json::to_vec(&record)?;
            transfers.insert(record.id.as_str(), record_raw.as_slice())?;

            let key = make_index_key(&account_id, now.timestamp(), &record.id);
            index.insert(key.as_slice(), direction)?;
            rollbacks.insert(transaction_ref, record.id.as_str())?;

            record
        };
        write_txn.commit()?;

        tracing::info!(
            transaction_ref,
            transfer_id = %record.id,
            "provider operation rolled back"
        );
        Ok(record)
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Paginated listing of an account's transfers, newest first.
    ///
    /// Returns `(records_with_direction, next_cursor)`.
    pub fn transfers_for_account(
        &self,
        account_id: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> LedgerResult<(Vec<(TransferRecord, String)>, Option<String>)> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ACCOUNT_TX_INDEX)?;
        let transfers = read_txn.open_table(TRANSFERS)?;

        let prefix = make_prefix(account_id);
        let prefix_end = make_prefix_end(account_id);

        // Determine scan start: either after cursor or from prefix start.
        // An undecodable cursor is treated as absent, otherwise the skip
        // below would swallow the newest record.
        let (start, mut skip_first): (Vec<u8>, bool) = match cursor.and_then(decode_cursor) {
            Some(key) => (key, true),
            None => (prefix.clone(), false),
        };

        let mut results = Vec::with_capacity(limit + 1);
        let range = index.range(start.as_slice()..prefix_end.as_slice())?;
        let mut last_key: Option<Vec<u8>> = None;

        for entry in range {
            let entry = entry?;
            let key_bytes = entry.0.value().to_vec();
            let direction = entry.1.value().to_string();

            // Skip the cursor entry itself
            if skip_first {
                skip_first = false;
                continue;
            }

            if let Some(transfer_id) = extract_transfer_id_from_key(&key_bytes) {
                if let Some(record) = load_transfer(&transfers, &transfer_id)? {
                    results.push((record, direction));
                    last_key = Some(key_bytes);
                }
            }

            if results.len() >= limit {
                break;
            }
        }

        let next_cursor = if results.len() >= limit {
            last_key.map(|k| encode_cursor(&k))
        } else {
            None
        };

        Ok((results, next_cursor))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Apply a single-account operator mutation (deposit or withdraw).
    fn apply_single(
        &self,
        account_id: &str,
        amount: i64,
        kind: TransferKind,
        note: Option<String>,
    ) -> LedgerResult<TransferRecord> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let write_txn = self.db.begin_write()?;
        let record = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let mut transfers = write_txn.open_table(TRANSFERS)?;
            let mut index = write_txn.open_table(ACCOUNT_TX_INDEX)?;

            let mut account = load_account(&accounts, account_id)?;
            let before = account.balance;
            let now = Utc::now();

            let (new_balance, direction) = match kind {
                TransferKind::Deposit => (
                    account
                        .balance
                        .checked_add(amount)
                        .ok_or(LedgerError::InvalidAmount(amount))?,
                    "credit",
                ),
                TransferKind::Withdraw => {
                    if account.balance < amount {
                        return Err(LedgerError::InsufficientFunds(account_id.to_string()));
                    }
                    (account.balance - amount, "debit")
                }
                _ => unreachable!("provider kinds have their own path"),
            };

            account.balance = new_balance;
            account.updated_at = now;
            let account_raw = serde_json::to_vec(&account)?;
            accounts.insert(account_id, account_raw.as_slice())?;

            let record = TransferRecord {
                id: Uuid::new_v4().to_string(),
                sender_id: account_id.to_string(),
                receiver_id: account_id.to_string(),
                kind,
                amount,
                note,
                transaction_ref: None,
                balance_before: before,
                balance_after: account.balance,
                created_at: now,
            };
            let record_raw = serde_json::to_vec(&record)?;
            transfers.insert(record.id.as_str(), record_raw.as_slice())?;

            let key = make_index_key(account_id, now.timestamp(), &record.id);
            index.insert(key.as_slice(), direction)?;

            record
        };
        write_txn.commit()?;
        Ok(record)
    }

    /// Apply a provider-initiated mutation with the idempotency check.
    ///
    /// The replay check and the apply share one write transaction, so a
    /// concurrent duplicate cannot slip between them.
    fn apply_provider(
        &self,
        account_id: &str,
        amount: i64,
        kind: TransferKind,
        transaction_ref: &str,
    ) -> LedgerResult<TransferRecord> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let write_txn = self.db.begin_write()?;
        let record = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let mut transfers = write_txn.open_table(TRANSFERS)?;
            let mut index = write_txn.open_table(ACCOUNT_TX_INDEX)?;
            let mut refs = write_txn.open_table(PROVIDER_REF_INDEX)?;

            if let Some(existing) = lookup_provider_ref(&refs, &transfers, transaction_ref)? {
                if existing.kind == kind
                    && existing.amount == amount
                    && existing.receiver_id == account_id
                {
                    tracing::debug!(transaction_ref, "replayed provider call, returning original");
                    return Ok(existing);
                }
                return Err(LedgerError::AlreadyProcessed(transaction_ref.to_string()));
            }

            let mut account = load_account(&accounts, account_id)?;
            let before = account.balance;
            let now = Utc::now();

            let (new_balance, direction) = match kind {
                TransferKind::ProviderCredit => (
                    account
                        .balance
                        .checked_add(amount)
                        .ok_or(LedgerError::InvalidAmount(amount))?,
                    "credit",
                ),
                TransferKind::ProviderDebit => {
                    if account.balance < amount {
                        return Err(LedgerError::InsufficientFunds(account_id.to_string()));
                    }
                    (account.balance - amount, "debit")
                }
                _ => unreachable!("only provider debit/credit reach this path"),
            };

            account.balance = new_balance;
            account.updated_at = now;
            let account_raw = serde_json::to_vec(&account)?;
            accounts.insert(account_id, account_raw.as_slice())?;

            let record = TransferRecord {
                id: Uuid::new_v4().to_string(),
                sender_id: account_id.to_string(),
                receiver_id: account_id.to_string(),
                kind,
                amount,
                note: None,
                transaction_ref: Some(transaction_ref.to_string()),
                balance_before: before,
                balance_after: account.balance,
                created_at: now,
            };
            let record_raw = serde_json::to_vec(&record)?;
            transfers.insert(record.id.as_str(), record_raw.as_slice())?;

            let key = make_index_key(account_id, now.timestamp(), &record.id);
            index.insert(key.as_slice(), direction)?;
            refs.insert(transaction_ref, record.id.as_str())?;

            record
        };
        write_txn.commit()?;

        tracing::info!(
            account_id,
            amount,
            transaction_ref,
            transfer_id = %record.id,
            kind = ?record.kind,
            "provider mutation applied"
        );
        Ok(record)
    }
}

// =============================================================================
// Tests
// =============================================================================
