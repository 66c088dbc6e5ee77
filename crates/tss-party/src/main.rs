//! TSS Party CLI
//!
//! Runs a whole committee in one process, for operators and smoke tests:
//! - Genesis keying
//! - Rekeying rounds with rotated encryption keys
//! - Threshold signing and verification against the ledger ID

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tss_core::directory::{allocate_shares, default_threshold};
use tss_core::{
    PairingPrivateKey, PairingPublicKey, PairingSignature, ParticipantDirectory, ParticipantId,
    PrivateShare, PublicShare, SignatureSchema, TssMessage, TssService,
};

/// TSS Party - in-process threshold signature committee
#[derive(Parser)]
#[command(name = "tss-party")]
#[command(about = "BLS threshold signature committee with rekeying")]
#[command(version)]
struct Cli {
    /// Data directory for ceremony artifacts
    #[arg(short, long, env = "DEST", default_value = "./data")]
    dest: PathBuf,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Key a committee, rekey it and sign a message
    Ceremony {
        /// Participant weights as id=weight (comma-separated)
        #[arg(
            short,
            long,
            env = "TSS_WEIGHTS",
            value_delimiter = ',',
            value_parser = parse_weight,
            default_value = "1=1,2=1,3=1,4=1"
        )]
        weights: Vec<(ParticipantId, u64)>,

        /// Shares given to the heaviest participant
        #[arg(long, env = "TSS_MAX_SHARES", default_value_t = 2)]
        max_shares: u32,

        /// Threshold (defaults to a strict majority of shares)
        #[arg(short, long, env = "TSS_THRESHOLD")]
        threshold: Option<usize>,

        /// Number of rekeying rounds after genesis
        #[arg(short, long, env = "TSS_REKEY_ROUNDS", default_value_t = 1)]
        rekey_rounds: usize,

        /// Message to sign (UTF-8)
        #[arg(short, long, default_value = "hello ledger")]
        message: String,

        /// Seed for deterministic runs
        #[arg(long, env = "TSS_SEED")]
        seed: Option<u64>,
    },

    /// Verify the signature recorded by a ceremony
    Verify,

    /// Show the recorded ceremony
    Info,
}

/// Everything a ceremony publishes
#[derive(Serialize, Deserialize)]
struct CeremonyRecord {
    ledger_id: PairingPublicKey,
    threshold: usize,
    share_counts: BTreeMap<ParticipantId, u32>,
    rounds: Vec<RoundRecord>,
    /// Hex encoded
    message: String,
    signature: PairingSignature,
}

#[derive(Serialize, Deserialize)]
struct RoundRecord {
    kind: String,
    ledger_id: PairingPublicKey,
    messages: Vec<TssMessage>,
    public_shares: Vec<PublicShare>,
}

/// Outcome of one keying round
struct Round {
    directories: Vec<ParticipantDirectory>,
    messages: Vec<TssMessage>,
    private_shares: BTreeMap<ParticipantId, Vec<PrivateShare>>,
    public_shares: Vec<PublicShare>,
    ledger_id: PairingPublicKey,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    std::fs::create_dir_all(&cli.dest)?;

    match cli.command {
        Commands::Ceremony {
            ref weights,
            max_shares,
            threshold,
            rekey_rounds,
            ref message,
            seed,
        } => {
            run_ceremony(&cli.dest, weights, max_shares, threshold, rekey_rounds, message, seed)?;
        }
        Commands::Verify => {
            run_verify(&cli.dest)?;
        }
        Commands::Info => {
            show_info(&cli.dest)?;
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn parse_weight(value: &str) -> std::result::Result<(ParticipantId, u64), String> {
    let (id, weight) = value
        .split_once('=')
        .ok_or_else(|| format!("expected id=weight, got {}", value))?;
    let id = id.trim().parse().map_err(|e| format!("bad participant id: {}", e))?;
    let weight = weight.trim().parse().map_err(|e| format!("bad weight: {}", e))?;
    Ok((id, weight))
}

fn run_ceremony(
    dest: &Path,
    weights: &[(ParticipantId, u64)],
    max_shares: u32,
    threshold: Option<usize>,
    rekey_rounds: usize,
    message: &str,
    seed: Option<u64>,
) -> Result<()> {
    let weights: BTreeMap<ParticipantId, u64> = weights.iter().copied().collect();
    let share_counts: BTreeMap<ParticipantId, u32> = allocate_shares(&weights, max_shares)
        .into_iter()
        .filter(|(id, count)| {
            if *count == 0 {
                warn!(participant = id, "Participant receives no shares, leaving it out");
            }
            *count > 0
        })
        .collect();
    let total_shares: usize = share_counts.values().map(|count| *count as usize).sum();
    let threshold = threshold.unwrap_or_else(|| default_threshold(total_shares));

    info!(
        participants = share_counts.len(),
        total_shares,
        threshold,
        rekey_rounds,
        "Starting ceremony"
    );

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let schema = SignatureSchema::default();
    let mut service = TssService::new(schema, StdRng::from_rng(&mut rng)?);
    let mut rounds = Vec::with_capacity(rekey_rounds + 1);

    // Genesis
    let directories = build_directories(&mut rng, schema, &share_counts, threshold)?;
    let mut messages = Vec::new();
    for directory in &directories {
        messages.extend(service.generate_genesis_messages(directory)?);
    }
    let mut round = collect_round(&service, directories, messages)?;
    let ledger_id = round.ledger_id;
    rounds.push(round_record("genesis", &round));

    for number in 1..=rekey_rounds {
        let directories = build_directories(&mut rng, schema, &share_counts, threshold)?;
        let mut messages = Vec::new();
        for (participant, shares) in &round.private_shares {
            let directory = directories
                .iter()
                .find(|directory| directory.self_id() == *participant)
                .ok_or_else(|| anyhow!("No directory for participant {}", participant))?;
            for share in shares {
                messages.push(service.generate_rekey_message(directory, share)?);
            }
        }
        round = collect_round(&service, directories, messages)?;
        if round.ledger_id != ledger_id {
            bail!("Rekeying round {} changed the ledger ID", number);
        }
        rounds.push(round_record(&format!("rekey-{}", number), &round));
    }

    let signature = threshold_sign(&service, &round, message.as_bytes())?;

    for (participant, shares) in &round.private_shares {
        let path = dest.join(format!("shares.{}.json", participant));
        std::fs::write(&path, serde_json::to_string_pretty(shares)?)?;
    }

    let record = CeremonyRecord {
        ledger_id,
        threshold,
        share_counts,
        rounds,
        message: hex::encode(message.as_bytes()),
        signature,
    };
    let path = dest.join("ceremony.json");
    std::fs::write(&path, serde_json::to_string_pretty(&record)?)?;

    info!(
        ledger_id = hex::encode(ledger_id.to_bytes()),
        path = ?path,
        "Ceremony completed, artifacts saved"
    );

    println!("Ledger ID: {}", hex::encode(ledger_id.to_bytes()));
    println!("Signature: {}", hex::encode(signature.to_bytes()));

    Ok(())
}

/// One directory per participant, each with a fresh encryption key
fn build_directories(
    rng: &mut StdRng,
    schema: SignatureSchema,
    share_counts: &BTreeMap<ParticipantId, u32>,
    threshold: usize,
) -> Result<Vec<ParticipantDirectory>> {
    let keys: BTreeMap<ParticipantId, PairingPrivateKey> = share_counts
        .keys()
        .map(|id| (*id, PairingPrivateKey::random(&mut *rng)))
        .collect();

    keys.iter()
        .map(|(me, private_key)| {
            let mut builder = ParticipantDirectory::builder().with_self(*me, private_key.clone())?;
            for (id, key) in &keys {
                builder = builder.with_participant(*id, share_counts[id], key.public_key())?;
            }
            Ok(builder
                .with_threshold(threshold)?
                .build(schema)?)
        })
        .collect()
}

/// Broadcast messages as bytes and let every participant recover its shares
fn collect_round(
    service: &TssService<StdRng>,
    directories: Vec<ParticipantDirectory>,
    messages: Vec<TssMessage>,
) -> Result<Round> {
    let broadcast = messages
        .iter()
        .map(TssMessage::to_bytes)
        .collect::<tss_core::Result<Vec<_>>>()?;
    for message in &messages {
        debug!(
            issuer = %message.issuer,
            digest = hex::encode(message.hash()?),
            "TSS message broadcast"
        );
    }

    let mut private_shares = BTreeMap::new();
    let mut accepted = Vec::new();
    for directory in &directories {
        let valid = service.validate_tss_messages(directory, broadcast.as_slice());
        if !service.is_threshold_met(directory, &valid) {
            bail!(
                "Participant {} accepted {} messages, {} required",
                directory.self_id(),
                valid.len(),
                directory.threshold()
            );
        }
        let shares = service
            .decrypt_private_shares(directory, &valid)?
            .ok_or_else(|| anyhow!("Participant {} could not decrypt", directory.self_id()))?;
        private_shares.insert(directory.self_id(), shares);
        accepted = valid;
    }

    let first = directories
        .first()
        .ok_or_else(|| anyhow!("Committee has no participants"))?;
    let public_shares = service
        .compute_public_shares(first, &accepted)?
        .ok_or_else(|| anyhow!("Not enough messages to compute public shares"))?;
    let ledger_id = service
        .ledger_id(first, &accepted)?
        .ok_or_else(|| anyhow!("Not enough messages to compute the ledger ID"))?;

    Ok(Round {
        directories,
        messages: accepted,
        private_shares,
        public_shares,
        ledger_id,
    })
}

fn round_record(kind: &str, round: &Round) -> RoundRecord {
    RoundRecord {
        kind: kind.to_string(),
        ledger_id: round.ledger_id,
        messages: round.messages.clone(),
        public_shares: round.public_shares.clone(),
    }
}

/// Sign with the first threshold shares and check the result
fn threshold_sign(
    service: &TssService<StdRng>,
    round: &Round,
    message: &[u8],
) -> Result<PairingSignature> {
    let directory = round
        .directories
        .first()
        .ok_or_else(|| anyhow!("Committee has no participants"))?;
    let signers: Vec<&PrivateShare> = round
        .private_shares
        .values()
        .flatten()
        .take(directory.threshold())
        .collect();

    let mut partials = Vec::with_capacity(signers.len());
    for share in signers {
        let partial = service.sign(share, message);
        if !service.verify_signature(directory, &round.public_shares, &partial, message) {
            bail!("Share signature of {} does not verify", share.share_id);
        }
        partials.push(partial);
    }

    let signature = service.aggregate_signatures(&partials)?;
    if !round.ledger_id.verify(service.schema(), message, &signature) {
        bail!("Aggregate signature does not verify under the ledger ID");
    }

    info!(signers = partials.len(), "Threshold signature generated");
    Ok(signature)
}

fn run_verify(dest: &Path) -> Result<()> {
    let record = load_record(dest)?;
    let message = hex::decode(&record.message)?;

    let valid = record
        .signature
        .verify(&SignatureSchema::default(), &record.ledger_id, &message);

    info!(valid, "Signature checked against ledger ID");
    println!("Signature valid: {}", valid);

    if !valid {
        bail!("Signature does not verify");
    }
    Ok(())
}

fn show_info(dest: &Path) -> Result<()> {
    let record = load_record(dest)?;

    println!("Ceremony Info:");
    println!("  Ledger ID: {}", hex::encode(record.ledger_id.to_bytes()));
    println!("  Threshold: {}", record.threshold);
    println!(
        "  Shares: {}",
        record.share_counts.values().map(|count| *count as usize).sum::<usize>()
    );
    for (participant, count) in &record.share_counts {
        println!("    participant {}: {}", participant, count);
    }
    for round in &record.rounds {
        println!("  Round {}: {} messages", round.kind, round.messages.len());
    }
    println!("  Message: {}", record.message);
    println!("  Signature: {}", hex::encode(record.signature.to_bytes()));

    Ok(())
}

fn load_record(dest: &Path) -> Result<CeremonyRecord> {
    let path = dest.join("ceremony.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let record: CeremonyRecord = serde_json::from_str(&json)?;
    Ok(record)
}
