//! `pgtable` reads a memory map and writes a GNU assembly file with an
//! `mmu_on` routine that builds the identity-map translation tables at runtime
//! and enables the MMU on every core that calls it.
//!
//! ```text
//! pgtable -i board.mmap -o mmu_on.S -ttb 0x90000000 -el 2 -tg 64K -tsz 32
//! ```

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use env_logger::Env;
use log::{LevelFilter, debug, info};
use mmu_codegen::{Invocation, assemble, listing};
use mmu_info::{AddressSpaceBits, ExceptionLevel, GeneratorConfig, Granule};
use mmu_registers::{RegisterValues, SystemRegister};
use mmu_tables::{AlignmentPolicy, generate};
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

/// Multi-letter options that are traditionally spelled with a single dash.
const SINGLE_DASH_LONG: [&str; 4] = ["-ttb", "-el", "-tg", "-tsz"];

#[derive(Debug, Parser)]
#[command(
    name = "pgtable",
    author,
    version,
    about = "Generate AArch64 identity-map translation tables and the code to install them",
    long_about = None
)]
struct Cli {
    /// Input memory map file.
    #[arg(short = 'i', value_name = "SRC")]
    input: PathBuf,

    /// Output GNU assembly file.
    #[arg(short = 'o', value_name = "DST")]
    output: PathBuf,

    /// Physical address of the translation table buffer (hex with `0x`, or decimal).
    #[arg(long = "ttb", value_name = "ADDR", value_parser = parse_address)]
    table_base: u64,

    /// Exception level whose registers are programmed.
    #[arg(long = "el", value_name = "1|2|3", default_value_t = GeneratorConfig::DEFAULT_EXCEPTION_LEVEL)]
    exception_level: ExceptionLevel,

    /// Translation granule.
    #[arg(long = "tg", value_name = "4K|16K|64K", default_value_t = GeneratorConfig::DEFAULT_GRANULE)]
    granule: Granule,

    /// Address space size in bits.
    #[arg(long = "tsz", value_name = "32|36|40|48", default_value_t = GeneratorConfig::DEFAULT_ADDRESS_SPACE)]
    address_space: AddressSpaceBits,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', action = ArgAction::Count)]
    verbose: u8,

    /// Reject memory map records that are not granule aligned instead of widening them.
    #[arg(long)]
    strict_align: bool,
}

impl Cli {
    fn config(&self) -> Result<GeneratorConfig> {
        GeneratorConfig::new(
            self.table_base,
            self.exception_level,
            self.granule,
            self.address_space,
        )
        .context("invalid translation regime configuration")
    }

    const fn alignment(&self) -> AlignmentPolicy {
        if self.strict_align {
            AlignmentPolicy::Strict
        } else {
            AlignmentPolicy::Widen
        }
    }
}

fn parse_address(value: &str) -> Result<u64, String> {
    let value = value.trim().replace('_', "");
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid address `{value}`: {e}"))
}

/// Rewrites `-ttb` style options to `--ttb` so clap accepts both spellings.
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some(s) => {
                let (flag, value) = s.split_once('=').map_or((s, None), |(f, v)| (f, Some(v)));
                if SINGLE_DASH_LONG.contains(&flag) {
                    let mut long = format!("-{flag}");
                    if let Some(value) = value {
                        long.push('=');
                        long.push_str(value);
                    }
                    OsString::from(long)
                } else {
                    arg
                }
            }
            None => arg,
        })
        .collect()
}

const fn level_filter(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn init_logging(verbose: u8) {
    let default_level = level_filter(verbose);
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()));
    builder.format_timestamp(None);
    let _ = builder.try_init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.config()?;
    info!(
        "EL{}, {} granule, {}-bit address space, tables at {:#x}",
        config.exception_level().number(),
        config.granule(),
        config.address_space().bits(),
        config.table_base()
    );

    let text = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read memory map {}", cli.input.display()))?;

    let tables = generate(&text, &config, cli.alignment())
        .with_context(|| format!("failed to generate tables for {}", cli.input.display()))?;
    info!("built {} translation tables", tables.table_count());

    let registers = RegisterValues::for_config(&config);
    for reg in SystemRegister::ALL {
        debug!("{} = {:#x}", reg.at(config.exception_level()), registers.get(reg));
    }

    let input = cli.input.to_string_lossy();
    let source = assemble(&tables, &Invocation { input: &input });

    fs::write(&cli.output, source)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    info!("wrote {}", cli.output.display());

    println!("{}", listing::usage(&tables));
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    init_logging(cli.verbose);
    run(&cli)
}
