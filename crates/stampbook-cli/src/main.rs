//! Stampbook CLI — `stamp` command.
//!
//! Drives a local ledger file: mint passports, register events, sign
//! claims as an event signer, and redeem them as a passport holder.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::debug;

use stampbook::crypto::random::random_nonce;
use stampbook::storage::{KeyFile, LedgerFile, LedgerLock};
use stampbook::time::{now_secs, secs_to_rfc3339};
use stampbook::{
    ClaimPayload, EventDraft, EventId, IdentityId, LedgerSnapshot, Nonce, Principal,
    SignerKeyPair, Stampbook, StampbookConfig, SystemClock,
};

// ── Directory helpers ─────────────────────────────────────────────────────────

/// Resolve the state home: `--home`, then `STAMPBOOK_HOME`, then `~/.stampbook`.
fn resolve_home(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(home) = flag {
        return Ok(home);
    }
    if let Ok(home) = std::env::var("STAMPBOOK_HOME") {
        return Ok(PathBuf::from(home));
    }
    let user_home = std::env::var("HOME").context("HOME not set; pass --home")?;
    Ok(PathBuf::from(user_home).join(".stampbook"))
}

fn key_path(home: &Path, name: &str) -> PathBuf {
    home.join("keys").join(format!("{name}.key"))
}

fn ledger_path(home: &Path) -> PathBuf {
    home.join("ledger.json")
}

/// How long a command waits for another `stamp` process to finish.
const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

// ── Session ───────────────────────────────────────────────────────────────────

/// A loaded ledger plus where to write it back.
///
/// The ledger lock is taken before loading and released when the session
/// drops, so load, mutate and save run as one exclusive unit.
struct Session {
    home: PathBuf,
    ledger_file: LedgerFile,
    book: Stampbook,
    _lock: LedgerLock,
}

impl Session {
    fn open(home: PathBuf, config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = config_path.unwrap_or_else(|| home.join("config.json"));
        let config = if config_path.exists() {
            StampbookConfig::load(&config_path)
                .with_context(|| format!("failed to load config {}", config_path.display()))?
        } else {
            StampbookConfig::default()
        };
        config.validate().context("invalid configuration")?;

        let ledger_file = LedgerFile::new(ledger_path(&home));
        let lock = ledger_file
            .lock(LOCK_TIMEOUT)
            .context("another stamp command is using this ledger")?;
        debug!("locked {}", lock.path().display());

        let clock = Arc::new(SystemClock);
        let book = if ledger_file.exists() {
            let snapshot = ledger_file.load().context("failed to load ledger")?;
            debug!(
                "loaded {} ({} stamps)",
                ledger_file.path().display(),
                snapshot.stamps.len()
            );
            Stampbook::from_snapshot(config, clock, snapshot).context("ledger is inconsistent")?
        } else {
            debug!("no ledger at {}; starting empty", ledger_file.path().display());
            Stampbook::with_clock(config, clock)
        };

        Ok(Self {
            home,
            ledger_file,
            book,
            _lock: lock,
        })
    }

    fn save(&self) -> Result<()> {
        let snapshot: LedgerSnapshot = self.book.snapshot();
        self.ledger_file
            .save(&snapshot)
            .context("failed to save ledger")?;
        debug!("saved {}", self.ledger_file.path().display());
        Ok(())
    }

    fn key_pair(&self, name: &str) -> Result<SignerKeyPair> {
        let path = key_path(&self.home, name);
        if !path.exists() {
            return Err(anyhow!(
                "key '{}' not found (expected at {}); run `stamp keygen {name}`",
                name,
                path.display()
            ));
        }
        let file = KeyFile::load(&path).context("failed to load key file")?;
        Ok(file.key_pair()?)
    }

    fn principal(&self, name: &str) -> Result<Principal> {
        Ok(self.key_pair(name)?.principal())
    }

    /// A `0x…` principal, or the name of a local key.
    fn resolve_principal(&self, who: &str) -> Result<Principal> {
        if who.starts_with("0x") {
            return who
                .parse()
                .map_err(|e| anyhow!("invalid principal '{who}': {e}"));
        }
        self.principal(who)
    }
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// Stampbook CLI — soulbound passports and attendance stamps.
#[derive(Parser, Debug)]
#[command(
    name = "stamp",
    about = "Stampbook CLI",
    version,
    long_about = "stamp — Stampbook CLI\n\nMint non-transferable passports, register events, sign claims,\nand redeem them for attendance stamps."
)]
struct Cli {
    /// State directory (default: $STAMPBOOK_HOME or ~/.stampbook)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Config file (default: <home>/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Act as this local key
    #[arg(long = "as", global = true, default_value = "default")]
    as_key: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a named key pair
    Keygen {
        /// Key name (default: the --as name)
        name: Option<String>,
    },

    /// Mint a passport for the acting key
    Mint,

    /// Manage events
    Event {
        #[command(subcommand)]
        subcommand: EventCommands,
    },

    /// Sign a claim for an event as its signer
    Sign {
        /// Event ID
        #[arg(long)]
        event: u64,

        /// Nonce as 0x-hex (default: random)
        #[arg(long)]
        nonce: Option<String>,

        /// Seconds the claim stays valid
        #[arg(long, default_value = "3600")]
        ttl: u64,

        /// Use single-letter field names
        #[arg(long)]
        compact: bool,

        /// Emit a claim link under this base URL instead of a bare payload
        #[arg(long)]
        link: Option<String>,
    },

    /// Redeem a claim payload or link
    Claim {
        /// Encoded payload or claim link
        payload: String,

        /// Passport to stamp (default: the acting key's first passport)
        #[arg(long)]
        identity: Option<u64>,

        /// Run every check without committing
        #[arg(long)]
        dry_run: bool,
    },

    /// List stamps held by a principal
    Stamps {
        /// Principal or key name (default: the acting key)
        owner: Option<String>,
    },

    /// Show ledger totals
    Status,
}

#[derive(Subcommand, Debug)]
enum EventCommands {
    /// Register a new event
    Create {
        /// Event name
        #[arg(long)]
        name: String,

        /// Event description
        #[arg(long, default_value = "")]
        description: String,

        /// Icon URL
        #[arg(long, default_value = "")]
        icon_url: String,

        /// Signer principal or key name (default: the acting key)
        #[arg(long)]
        signer: Option<String>,
    },

    /// Display an event
    Show {
        /// Event ID
        id: u64,
    },

    /// Seconds until a principal may create another event
    Cooldown {
        /// Principal or key name (default: the acting key)
        principal: Option<String>,
    },
}

// ── Main entry point ──────────────────────────────────────────────────────────

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let result = run(cli);

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let verbose = cli.verbose;
    let home = resolve_home(cli.home)?;
    let as_key = cli.as_key;

    // Key generation needs no ledger.
    let command = match cli.command {
        Commands::Keygen { name } => {
            let name = name.unwrap_or(as_key);
            return cmd_keygen(&home, &name, verbose);
        }
        other => other,
    };

    let session = Session::open(home, cli.config)?;
    match command {
        Commands::Keygen { .. } => Ok(()),
        Commands::Mint => cmd_mint(&session, &as_key, verbose),
        Commands::Event { subcommand } => match subcommand {
            EventCommands::Create {
                name,
                description,
                icon_url,
                signer,
            } => cmd_event_create(
                &session,
                &as_key,
                &name,
                &description,
                &icon_url,
                signer.as_deref(),
                verbose,
            ),
            EventCommands::Show { id } => cmd_event_show(&session, id, verbose),
            EventCommands::Cooldown { principal } => {
                cmd_event_cooldown(&session, principal.as_deref().unwrap_or(&as_key))
            }
        },
        Commands::Sign {
            event,
            nonce,
            ttl,
            compact,
            link,
        } => cmd_sign(
            &session,
            &as_key,
            event,
            nonce.as_deref(),
            ttl,
            compact,
            link.as_deref(),
        ),
        Commands::Claim {
            payload,
            identity,
            dry_run,
        } => cmd_claim(&session, &as_key, &payload, identity, dry_run, verbose),
        Commands::Stamps { owner } => {
            cmd_stamps(&session, owner.as_deref().unwrap_or(&as_key), verbose)
        }
        Commands::Status => cmd_status(&session),
    }
}

// ── Command implementations ───────────────────────────────────────────────────

/// `stamp keygen [NAME]`
fn cmd_keygen(home: &Path, name: &str, verbose: bool) -> Result<()> {
    let path = key_path(home, name);
    if path.exists() {
        return Err(anyhow!(
            "key '{}' already exists at {}",
            name,
            path.display()
        ));
    }
    let key_pair = SignerKeyPair::generate();
    KeyFile::from_key_pair(name, &key_pair)
        .save(&path)
        .context("failed to save key")?;

    println!("Created key '{name}'");
    println!("  Principal: {}", key_pair.principal());
    if verbose {
        println!("  File:      {}", path.display());
    }
    Ok(())
}

/// `stamp mint [--as NAME]`
fn cmd_mint(session: &Session, as_key: &str, verbose: bool) -> Result<()> {
    let caller = session.principal(as_key)?;
    let id = session.book.mint_passport(caller)?;
    session.save()?;

    println!("Minted passport {id} to {caller}");
    if verbose {
        if let Some(record) = session.book.get_identity(id) {
            println!("  Minted: {}", secs_to_rfc3339(record.minted_at));
        }
    }
    Ok(())
}

/// `stamp event create --name NAME [--description D] [--icon-url U] [--signer S]`
fn cmd_event_create(
    session: &Session,
    as_key: &str,
    name: &str,
    description: &str,
    icon_url: &str,
    signer: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let caller = session.principal(as_key)?;
    let signer = match signer {
        Some(who) => session.resolve_principal(who)?,
        None => caller,
    };
    let id = session
        .book
        .create_event(caller, EventDraft::new(name, description, icon_url, signer))?;
    session.save()?;

    println!("Created event {id} '{name}'");
    println!("  Signer: {signer}");
    if verbose {
        println!("  Creator: {caller}");
    }
    Ok(())
}

/// `stamp event show ID`
fn cmd_event_show(session: &Session, id: u64, verbose: bool) -> Result<()> {
    let event = session.book.get_event(EventId(id))?;
    println!("Event {}", event.id);
    println!("  Name:    {}", event.name);
    if !event.description.is_empty() {
        println!("  About:   {}", event.description);
    }
    if !event.icon_url.is_empty() {
        println!("  Icon:    {}", event.icon_url);
    }
    println!("  Signer:  {}", event.signer);
    println!("  Created: {}", secs_to_rfc3339(event.created_at));
    if verbose {
        println!("  Creator: {}", event.creator);
    }
    Ok(())
}

/// `stamp event cooldown [PRINCIPAL]`
fn cmd_event_cooldown(session: &Session, who: &str) -> Result<()> {
    let principal = session.resolve_principal(who)?;
    let remaining = session.book.event_cooldown_remaining(principal);
    if remaining == 0 {
        println!("{principal} may create an event now");
    } else {
        println!("{principal} must wait {remaining}s before creating another event");
    }
    Ok(())
}

/// `stamp sign --event ID [--nonce HEX] [--ttl SECS] [--compact] [--link BASE]`
fn cmd_sign(
    session: &Session,
    as_key: &str,
    event_id: u64,
    nonce: Option<&str>,
    ttl: u64,
    compact: bool,
    link: Option<&str>,
) -> Result<()> {
    let key_pair = session.key_pair(as_key)?;
    let event = session.book.get_event(EventId(event_id))?;
    if event.signer != key_pair.principal() {
        return Err(anyhow!(
            "key '{as_key}' ({}) is not the signer of event {} ({})",
            key_pair.principal(),
            event.id,
            event.signer
        ));
    }

    let nonce: Nonce = match nonce {
        Some(hex) => hex.parse().context("invalid --nonce")?,
        None => random_nonce(),
    };
    let expiration = now_secs().saturating_add(ttl);
    let payload = ClaimPayload::sign(
        &key_pair,
        event.id,
        nonce,
        expiration,
        session.book.config().context_id,
    );

    let out = match (link, compact) {
        (Some(base), _) => payload.to_link(base)?,
        (None, true) => payload.encode_compact()?,
        (None, false) => payload.encode()?,
    };
    println!("{out}");
    Ok(())
}

/// `stamp claim PAYLOAD [--identity ID] [--dry-run]`
fn cmd_claim(
    session: &Session,
    as_key: &str,
    encoded: &str,
    identity: Option<u64>,
    dry_run: bool,
    verbose: bool,
) -> Result<()> {
    let caller = session.principal(as_key)?;
    let payload = ClaimPayload::from_link(encoded).context("failed to decode claim")?;
    let identity_id = match identity {
        Some(id) => IdentityId(id),
        None => *session
            .book
            .identities_of(caller)
            .first()
            .ok_or_else(|| anyhow!("{caller} holds no passport; run `stamp mint` first"))?,
    };

    if verbose && payload.context_id != session.book.config().context_id {
        println!(
            "  Note: payload context {} differs from ledger context {}",
            payload.context_id,
            session.book.config().context_id
        );
    }

    if dry_run {
        let report = session
            .book
            .preflight_claim(caller, &payload.to_request(identity_id));
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let stamp_id = session.book.claim_payload(caller, identity_id, &payload)?;
    session.save()?;

    println!(
        "Claimed stamp {stamp_id} for event {} on passport {identity_id}",
        payload.event_id
    );
    if verbose {
        println!("  Nonce:   {}", payload.nonce);
        println!("  Expires: {}", secs_to_rfc3339(payload.expiration));
    }
    Ok(())
}

/// `stamp stamps [OWNER]`
fn cmd_stamps(session: &Session, who: &str, verbose: bool) -> Result<()> {
    let owner = session.resolve_principal(who)?;
    let ids = session.book.list_stamps(owner);
    if ids.is_empty() {
        println!("No stamps for {owner}");
        return Ok(());
    }
    println!("{} stamp(s) for {owner}", ids.len());
    for id in ids {
        let Some(stamp) = session.book.get_stamp(id) else {
            continue;
        };
        let name = session
            .book
            .get_event(stamp.event_id)
            .map(|e| e.name)
            .unwrap_or_default();
        println!("  {}  event {} '{}'", stamp.id, stamp.event_id, name);
        if verbose {
            println!("      claimed {}", secs_to_rfc3339(stamp.claimed_at));
        }
    }
    Ok(())
}

/// `stamp status`
fn cmd_status(session: &Session) -> Result<()> {
    let config = session.book.config();
    println!("Ledger:     {}", session.ledger_file.path().display());
    println!("Context:    {}", config.context_id);
    println!("Mode:       {:?}", config.identity_mode);
    println!("Cooldown:   {}s", config.event_cooldown_secs);
    println!("Passports:  {}", session.book.total_identities());
    println!("Events:     {}", session.book.total_events());
    println!("Stamps:     {}", session.book.total_stamps());
    Ok(())
}
