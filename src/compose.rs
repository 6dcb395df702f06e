use solana_sdk::address_lookup_table::AddressLookupTableAccount;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{AccountMeta, CompiledInstruction, Instruction};
use solana_sdk::message::{v0, MessageHeader, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;

use crate::error::{Error, Result};

/// Addresses pulled out of lookup tables, in runtime load order: every table's
/// writable entries first, then every table's readonly entries.
#[derive(Default)]
struct LoadedKeys {
    writable: Vec<Pubkey>,
    readonly: Vec<Pubkey>,
}

/// Rebuild editable instructions from a compiled message. Loaded addresses are
/// resolved against `tables`, which must contain the current state of every
/// table the message references.
pub fn decompile_instructions(
    message: &VersionedMessage,
    tables: &[AddressLookupTableAccount],
) -> Result<Vec<Instruction>> {
    match message {
        VersionedMessage::Legacy(m) => decompile_parts(
            &m.header,
            &m.account_keys,
            &LoadedKeys::default(),
            &m.instructions,
        ),
        VersionedMessage::V0(m) => {
            let loaded = load_table_addresses(m, tables)?;
            decompile_parts(&m.header, &m.account_keys, &loaded, &m.instructions)
        }
    }
}

/// Compile `instructions` into a fresh unsigned v0 transaction. Placeholder
/// signatures are sized from the compiled header; signing is the caller's.
pub fn recompile(
    payer: &Pubkey,
    instructions: &[Instruction],
    tables: &[AddressLookupTableAccount],
    recent_blockhash: Hash,
) -> Result<VersionedTransaction> {
    let message = v0::Message::try_compile(payer, instructions, tables, recent_blockhash)?;
    let num_signatures = message.header.num_required_signatures as usize;
    Ok(VersionedTransaction {
        signatures: vec![Signature::default(); num_signatures],
        message: VersionedMessage::V0(message),
    })
}

fn load_table_addresses(
    message: &v0::Message,
    tables: &[AddressLookupTableAccount],
) -> Result<LoadedKeys> {
    let mut loaded = LoadedKeys::default();
    for lookup in &message.address_table_lookups {
        let table = tables
            .iter()
            .find(|t| t.key == lookup.account_key)
            .ok_or_else(|| {
                Error::Decode(format!(
                    "message references lookup table {} which was not resolved",
                    lookup.account_key
                ))
            })?;
        for &index in &lookup.writable_indexes {
            loaded.writable.push(table_entry(table, index)?);
        }
        for &index in &lookup.readonly_indexes {
            loaded.readonly.push(table_entry(table, index)?);
        }
    }
    Ok(loaded)
}

fn table_entry(table: &AddressLookupTableAccount, index: u8) -> Result<Pubkey> {
    table.addresses.get(index as usize).copied().ok_or_else(|| {
        Error::Decode(format!(
            "lookup table {} has no entry at index {index}",
            table.key
        ))
    })
}

fn decompile_parts(
    header: &MessageHeader,
    static_keys: &[Pubkey],
    loaded: &LoadedKeys,
    compiled: &[CompiledInstruction],
) -> Result<Vec<Instruction>> {
    let num_signed = header.num_required_signatures as usize;
    if header.num_readonly_signed_accounts as usize > num_signed {
        return Err(Error::Decode(format!(
            "message header marks {} readonly signers but requires only {} signatures",
            header.num_readonly_signed_accounts, num_signed
        )));
    }
    let num_writable_signed = num_signed - header.num_readonly_signed_accounts as usize;
    let num_writable_unsigned = static_keys
        .len()
        .saturating_sub(num_signed)
        .saturating_sub(header.num_readonly_unsigned_accounts as usize);

    let mut metas: Vec<AccountMeta> =
        Vec::with_capacity(static_keys.len() + loaded.writable.len() + loaded.readonly.len());
    for (i, key) in static_keys.iter().enumerate() {
        let is_signer = i < num_signed;
        let is_writable = if is_signer {
            i < num_writable_signed
        } else {
            i - num_signed < num_writable_unsigned
        };
        metas.push(AccountMeta {
            pubkey: *key,
            is_signer,
            is_writable,
        });
    }
    for key in &loaded.writable {
        metas.push(AccountMeta::new(*key, false));
    }
    for key in &loaded.readonly {
        metas.push(AccountMeta::new_readonly(*key, false));
    }

    let mut instructions = Vec::with_capacity(compiled.len());
    for ix in compiled {
        let program_id = metas
            .get(ix.program_id_index as usize)
            .map(|m| m.pubkey)
            .ok_or_else(|| {
                Error::Decode(format!(
                    "instruction program index {} out of bounds",
                    ix.program_id_index
                ))
            })?;
        let mut accounts = Vec::with_capacity(ix.accounts.len());
        for &index in &ix.accounts {
            let meta = metas.get(index as usize).cloned().ok_or_else(|| {
                Error::Decode(format!("instruction account index {index} out of bounds"))
            })?;
            accounts.push(meta);
        }
        instructions.push(Instruction {
            program_id,
            accounts,
            data: ix.data.clone(),
        });
    }
    Ok(instructions)
}
