use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use color_eyre::eyre::bail;
use color_eyre::Result;
use log::info;
use simplelog::LevelFilter;

use circuit_bdd::bdd::Bdd;
use circuit_bdd::bench::read_bench;
use circuit_bdd::compile::CircuitToBdd;

#[derive(Parser, Debug)]
#[command(author, version, about = "Compile a .bench circuit into BDDs and dump them")]
struct Cli {
    /// Circuit in ISCAS .bench format
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output to dump (may be given multiple times; default: all declared outputs)
    #[arg(short, long = "output", value_name = "LABEL")]
    outputs: Vec<String>,

    /// Directory for the text and dot dumps
    #[arg(short = 'd', long, value_name = "DIR", default_value = "results")]
    result_dir: PathBuf,

    /// Initial size of the unique table, in bits
    #[arg(long, value_name = "INT", default_value_t = 16)]
    storage_bits: usize,

    /// Log the number of satisfying assignments of every dumped output
    #[arg(long)]
    count_models: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    simplelog::TermLogger::init(
        cli.log_level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    if cli.storage_bits > 31 {
        bail!("--storage-bits must be at most 31, got {}", cli.storage_bits);
    }

    let time_total = Instant::now();

    info!("Reading {}", cli.input.display());
    let netlist = read_bench(&cli.input)?;
    info!(
        "Netlist: {} nodes, {} inputs, {} outputs",
        netlist.nodes.len(),
        netlist.inputs.len(),
        netlist.outputs.len()
    );

    let mut c = CircuitToBdd::new(Bdd::new(cli.storage_bits));
    c.generate(&netlist.nodes, &cli.input)?;
    info!("bdd = {:?}", c.engine());

    let labels = if cli.outputs.is_empty() {
        netlist.outputs.clone()
    } else {
        cli.outputs.clone()
    };
    let files = c.print(&labels, &cli.result_dir)?;
    println!("text: {}", files.text.display());
    println!("dot: {}", files.dot.display());

    let bdd = c.engine();
    for (label, &node) in c.outputs().nodes.iter() {
        if cli.count_models {
            info!(
                "- {} of size {} with {} model(s) over {} variable(s)",
                label,
                bdd.size(node),
                bdd.sat_count(node, bdd.num_vars()),
                bdd.num_vars()
            );
        } else {
            info!("- {} of size {}", label, bdd.size(node));
        }
    }
    info!("cache hits = {}, misses = {}", bdd.cache().hits(), bdd.cache().misses());

    info!("Done in {:.3} s", time_total.elapsed().as_secs_f64());
    Ok(())
}
