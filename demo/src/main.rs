use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use codec::{pack_actions, release_all, unpack_actions, Action, ExperimenterRegistry, Field};
use gmpls::GmplsLabelAction;
use serde::Serialize;
use tools::{decode_actions_report, format_hex};
use wire::count_actions;

#[derive(Parser)]
#[command(
    name = "ofact-demo",
    version,
    about = "Deterministic action list generator and codec validation walk"
)]
struct Cli {
    /// Number of generated action lists.
    #[arg(long, default_value_t = 200)]
    lists: u32,
    /// Maximum actions per list.
    #[arg(long, default_value_t = 12)]
    max_actions: u32,
    /// RNG seed for deterministic results.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Optional output directory for capture files.
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Fail if average packed list size exceeds this value.
    #[arg(long)]
    max_avg_bytes: Option<u64>,
    /// Print the first list's records and hex.
    #[arg(long)]
    show_first: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let registry = tools::default_registry().context("build experimenter registry")?;

    if let Some(out_dir) = &cli.out_dir {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("create output dir {}", out_dir.display()))?;
    }

    let mut rng = Rng::new(cli.seed);
    let mut summary = Summary::new(cli.lists, cli.max_actions, cli.seed);

    for index in 0..cli.lists {
        let actions = generate_list(&mut rng, cli.max_actions);
        let bytes = pack_actions(&actions, Some(&registry)).context("pack actions")?;
        validate_list(&bytes, &actions, &registry)
            .with_context(|| format!("validate list {index}"))?;
        summary.push_list(&actions, bytes.len() as u64);

        if index == 0 {
            if cli.show_first {
                print_first_list(&bytes, &registry)?;
            }
            if let Some(out_dir) = &cli.out_dir {
                write_capture(out_dir, &bytes)?;
            }
        }
        release_all(actions, Some(&registry));
    }

    summary.finalize();
    summary.assert_budgets(cli.max_avg_bytes)?;
    if let Some(out_dir) = &cli.out_dir {
        write_summary_json(out_dir, &summary)?;
    }
    println!(
        "{} lists, {} actions ({} vendor records), avg {} bytes/list, max {} bytes",
        summary.lists,
        summary.actions_total,
        summary.vendor_records,
        summary.avg_bytes_per_list,
        summary.max_list_bytes
    );

    Ok(())
}

/// Pack-then-unpack must reproduce the source list exactly, and the
/// structural scan must agree with the decode on record count.
fn validate_list(
    bytes: &[u8],
    expected: &[Action],
    registry: &ExperimenterRegistry,
) -> Result<()> {
    let count = count_actions(bytes).context("count actions")?;
    if count != expected.len() {
        anyhow::bail!("scanner found {count} records, packed {}", expected.len());
    }
    let decoded = unpack_actions(bytes, Some(registry)).context("unpack actions")?;
    let matches = decoded == expected;
    release_all(decoded, Some(registry));
    if !matches {
        anyhow::bail!("decode produced a different action list");
    }
    Ok(())
}

fn print_first_list(bytes: &[u8], registry: &ExperimenterRegistry) -> Result<()> {
    println!("first list ({} bytes):", bytes.len());
    println!("  {}", format_hex(bytes));
    let report = decode_actions_report(bytes, Some(registry)).context("decode report")?;
    for action in &report.actions {
        println!("  [{:>4}] {}", action.offset, action.summary);
    }
    Ok(())
}

fn write_capture(out_dir: &Path, bytes: &[u8]) -> Result<()> {
    let path = out_dir.join("list_000001.bin");
    fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))
}

fn write_summary_json(out_dir: &Path, summary: &Summary) -> Result<()> {
    let path = out_dir.join("summary.json");
    let contents = serde_json::to_string_pretty(summary).context("serialize summary")?;
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn generate_list(rng: &mut Rng, max_actions: u32) -> Vec<Action> {
    let len = rng.next_u32() % (max_actions.max(1) + 1);
    (0..len).map(|_| generate_action(rng)).collect()
}

fn generate_action(rng: &mut Rng) -> Action {
    match rng.next_u32() % 18 {
        0 => Action::Output {
            port: if rng.next_u32() % 4 == 0 {
                wire::PORT_CONTROLLER
            } else {
                rng.next_u32() % 4096
            },
            max_len: if rng.next_u32() % 4 == 0 {
                wire::MAX_LEN_NO_BUFFER
            } else {
                (rng.next_u32() % 9000) as u16
            },
        },
        1 => Action::CopyTtlOut,
        2 => Action::CopyTtlIn,
        3 => Action::SetMplsTtl {
            ttl: (rng.next_u32() % 256) as u8,
        },
        4 => Action::DecMplsTtl,
        5 => Action::PushVlan { ethertype: 0x8100 },
        6 => Action::PopVlan,
        7 => Action::PushMpls { ethertype: 0x8847 },
        8 => Action::PopMpls { ethertype: 0x0800 },
        9 => Action::PushPbb { ethertype: 0x88e7 },
        10 => Action::PopPbb,
        11 => Action::SetQueue {
            queue_id: rng.next_u32() % 64,
        },
        12 => Action::Group {
            group_id: rng.next_u32() % 1024,
        },
        13 => Action::SetNwTtl {
            ttl: (rng.next_u32() % 256) as u8,
        },
        14 => Action::DecNwTtl,
        15 | 16 => generate_set_field(rng),
        _ => Action::Experimenter(Box::new(GmplsLabelAction::label([
            rng.next_u32(),
            rng.next_u32(),
            rng.next_u32(),
            rng.next_u32(),
        ]))),
    }
}

fn generate_set_field(rng: &mut Rng) -> Action {
    let field_id = (rng.next_u32() % 40) as u8;
    let value_len = 1 + (rng.next_u32() % 8) as usize;
    let value: Vec<u8> = (0..value_len).map(|_| (rng.next_u32() & 0xff) as u8).collect();
    let field = if rng.next_u32() % 3 == 0 {
        let mask = value.iter().map(|b| b | 0x0f).collect();
        Field::masked(0x8000, field_id, value, mask)
    } else {
        Field::new(0x8000, field_id, value)
    };
    Action::SetField(field)
}

struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    lists: u32,
    max_actions: u32,
    seed: u64,
    actions_total: u64,
    vendor_records: u64,
    bytes_total: u64,
    avg_bytes_per_list: u64,
    max_list_bytes: u64,
}

impl Summary {
    fn new(lists: u32, max_actions: u32, seed: u64) -> Self {
        Self {
            lists,
            max_actions,
            seed,
            actions_total: 0,
            vendor_records: 0,
            bytes_total: 0,
            avg_bytes_per_list: 0,
            max_list_bytes: 0,
        }
    }

    fn push_list(&mut self, actions: &[Action], bytes: u64) {
        self.actions_total += actions.len() as u64;
        self.vendor_records += actions
            .iter()
            .filter(|action| matches!(action, Action::Experimenter(_)))
            .count() as u64;
        self.bytes_total += bytes;
        self.max_list_bytes = self.max_list_bytes.max(bytes);
    }

    fn finalize(&mut self) {
        if self.lists > 0 {
            self.avg_bytes_per_list = self.bytes_total / u64::from(self.lists);
        }
    }

    fn assert_budgets(&self, max_avg: Option<u64>) -> Result<()> {
        if let Some(max_avg) = max_avg {
            if self.avg_bytes_per_list > max_avg {
                anyhow::bail!(
                    "avg list bytes {} exceeds budget {}",
                    self.avg_bytes_per_list,
                    max_avg
                );
            }
        }
        Ok(())
    }
}
