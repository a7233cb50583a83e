use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use activeregion::activeregion::{
    ActiveRegion, ActiveRegionWalker, ExtensionBounds, ReadState, ReadStates, TraversalConfig,
    TraverseActiveRegions, DEFAULT_EXTENSION,
};
use activeregion::downsampling::{AlleleBiasedDownsampler, RandomIndexSampler, RemovalLog};
use activeregion::genomics::{AlignedRead, CigarOp, CigarOpKind, Pileup, PileupElement, ReadGroup};
use activeregion::locus::{GenomeLoc, IntervalSet, SequenceDictionary};

#[derive(Parser, Debug)]
#[command(
    name = "activeregion",
    about = "Active-region classification and allele-biased downsampling"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tile intervals into active regions and classify reads against them.
    Regions {
        /// Sequence dictionary (`<name>\t<length>` per line).
        #[arg(long)]
        dict: PathBuf,
        /// Analysis intervals, sorted and merged (`<contig>\t<start>\t<stop>`).
        #[arg(long)]
        intervals: PathBuf,
        /// Aligned reads (`<name>\t<contig>\t<start>\t<end>`).
        #[arg(long)]
        reads: Option<PathBuf>,
        /// Activity applied to bases missing from the activity track.
        #[arg(long, default_value_t = 1.0)]
        activity: f64,
        /// Per-base activity (`<contig>\t<position>\t<value>`).
        #[arg(long)]
        activity_track: Option<PathBuf>,
        /// Bases added on each side of a region.
        #[arg(long, default_value_t = DEFAULT_EXTENSION)]
        extension: u32,
        /// Read states to report.
        #[arg(long, value_enum, value_delimiter = ',', default_value = "primary")]
        states: Vec<StateArg>,
        /// Clip extensions at contig ends instead of interval ends.
        #[arg(long)]
        contig_extension: bool,
    },
    /// Allele-biased downsampling of a single-locus pileup.
    Downsample {
        /// Pileup locus as `<contig>:<position>`.
        #[arg(long)]
        locus: String,
        /// Pileup rows: `<name> <start> <base> <quality> <sample> <library> <pu> <reduced>`,
        /// tab-separated.
        #[arg(long)]
        pileup: PathBuf,
        /// Fraction of elements to remove per allele.
        #[arg(long)]
        fraction: f64,
        /// Seed for the index sampler (entropy when omitted).
        #[arg(long)]
        seed: Option<u64>,
        /// Write removed reads to this file.
        #[arg(long)]
        removed_log: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StateArg {
    Primary,
    Nonprimary,
    Extended,
}

impl From<StateArg> for ReadState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Primary => ReadState::Primary,
            StateArg::Nonprimary => ReadState::NonPrimary,
            StateArg::Extended => ReadState::Extended,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Regions {
            dict,
            intervals,
            reads,
            activity,
            activity_track,
            extension,
            states,
            contig_extension,
        } => {
            let bounds = if contig_extension {
                ExtensionBounds::Contig
            } else {
                ExtensionBounds::Interval
            };
            let config = TraversalConfig::default()
                .with_extension(extension)
                .with_extension_bounds(bounds);
            let states = states.into_iter().map(ReadState::from).collect();
            run_regions(
                &dict,
                &intervals,
                reads.as_deref(),
                activity,
                activity_track.as_deref(),
                config,
                states,
            )?
        }
        Commands::Downsample {
            locus,
            pileup,
            fraction,
            seed,
            removed_log,
        } => run_downsample(&locus, &pileup, fraction, seed, removed_log.as_deref())?,
    }

    Ok(())
}

/// Walker reading activity from a per-base track with a fallback value.
#[derive(Debug)]
struct TrackWalker {
    default: f64,
    track: HashMap<(String, u32), f64>,
    states: ReadStates,
}

impl ActiveRegionWalker for TrackWalker {
    fn is_active(&mut self, locus: &GenomeLoc, _reads: &[Arc<AlignedRead>]) -> f64 {
        self.track
            .get(&(locus.contig().to_string(), locus.start()))
            .copied()
            .unwrap_or(self.default)
    }

    fn desired_read_states(&self) -> ReadStates {
        self.states
    }
}

fn run_regions(
    dict_path: &Path,
    intervals_path: &Path,
    reads_path: Option<&Path>,
    activity: f64,
    track_path: Option<&Path>,
    config: TraversalConfig,
    states: ReadStates,
) -> Result<()> {
    let dict = read_dictionary(dict_path)?;
    let intervals = read_intervals(intervals_path, &dict)?;
    let reads = match reads_path {
        Some(path) => read_reads(path, &dict)?,
        None => Vec::new(),
    };
    let track = match track_path {
        Some(path) => read_activity_track(path)?,
        None => HashMap::new(),
    };
    info!(
        intervals = intervals.len(),
        bases = intervals.base_count(),
        reads = reads.len(),
        "starting active region traversal"
    );

    let mut walker = TrackWalker {
        default: activity,
        track,
        states,
    };
    let mut traversal = TraverseActiveRegions::new(intervals, dict, config);
    let regions = traversal
        .traverse_intervals(&mut walker, &reads)
        .context("active region traversal failed")?;

    for region in &regions {
        print_region(region);
    }
    info!(regions = regions.len(), "traversal complete");
    Ok(())
}

fn run_downsample(
    locus: &str,
    pileup_path: &Path,
    fraction: f64,
    seed: Option<u64>,
    removed_log: Option<&Path>,
) -> Result<()> {
    let (contig, position) = locus
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("locus '{}' is not <contig>:<position>", locus))?;
    let position: u32 = position
        .parse()
        .with_context(|| format!("invalid position in locus '{}'", locus))?;
    let dict = SequenceDictionary::new([(contig, u32::MAX)]);
    let location = dict.loc(contig, position, position)?;
    let pileup = read_pileup(pileup_path, &dict, location)?;

    let sampler = match seed {
        Some(seed) => RandomIndexSampler::from_seed_u64(seed),
        None => RandomIndexSampler::from_entropy(),
    };
    let mut downsampler = AlleleBiasedDownsampler::new(sampler);
    if let Some(path) = removed_log {
        let file = File::create(path)
            .with_context(|| format!("failed to create removed-read log {}", path.display()))?;
        downsampler = downsampler.with_removal_log(RemovalLog::new(BufWriter::new(file)));
    }

    let kept = downsampler.downsample_pileup(&pileup, fraction);
    if let Some(log) = downsampler.removal_log() {
        log.flush();
    }
    info!(
        locus = %pileup.location(),
        input = pileup.len(),
        kept = kept.len(),
        fraction,
        "pileup downsampled"
    );

    for element in &kept {
        println!(
            "{}\t{}\t{}",
            element.read().name,
            element.read().start,
            element.base() as char
        );
    }
    Ok(())
}

fn data_lines(path: &Path) -> Result<Vec<(usize, Vec<String>)>> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut rows = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        rows.push((idx + 1, trimmed.split('\t').map(str::to_string).collect()));
    }
    Ok(rows)
}

fn field<'a>(fields: &'a [String], idx: usize, line_no: usize) -> Result<&'a str> {
    fields
        .get(idx)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing column {} on line {}", idx + 1, line_no))
}

fn parse_u32(fields: &[String], idx: usize, line_no: usize) -> Result<u32> {
    let raw = field(fields, idx, line_no)?;
    raw.parse()
        .with_context(|| format!("invalid integer '{}' on line {}", raw, line_no))
}

fn read_dictionary(path: &Path) -> Result<SequenceDictionary> {
    let mut entries = Vec::new();
    for (line_no, fields) in data_lines(path)? {
        let name = field(&fields, 0, line_no)?.to_string();
        let length = parse_u32(&fields, 1, line_no)?;
        entries.push((name, length));
    }
    Ok(SequenceDictionary::new(entries))
}

fn read_intervals(path: &Path, dict: &SequenceDictionary) -> Result<IntervalSet> {
    let mut locs = Vec::new();
    for (line_no, fields) in data_lines(path)? {
        let contig = field(&fields, 0, line_no)?;
        let start = parse_u32(&fields, 1, line_no)?;
        let stop = parse_u32(&fields, 2, line_no)?;
        locs.push(
            dict.loc(contig, start, stop)
                .with_context(|| format!("invalid interval on line {}", line_no))?,
        );
    }
    IntervalSet::new(locs).with_context(|| format!("invalid interval list {}", path.display()))
}

fn read_reads(path: &Path, dict: &SequenceDictionary) -> Result<Vec<Arc<AlignedRead>>> {
    let mut reads = Vec::new();
    for (line_no, fields) in data_lines(path)? {
        let name = field(&fields, 0, line_no)?;
        let contig = dict
            .contig(field(&fields, 1, line_no)?)
            .with_context(|| format!("unknown contig on line {}", line_no))?;
        let start = parse_u32(&fields, 2, line_no)?;
        let end = parse_u32(&fields, 3, line_no)?;
        if start == 0 || end < start {
            bail!("invalid read span {}-{} on line {}", start, end, line_no);
        }
        reads.push(Arc::new(AlignedRead::matching(name, contig, start, end)));
    }
    reads.sort_by(|a, b| {
        (a.contig_index, a.start, &a.name).cmp(&(b.contig_index, b.start, &b.name))
    });
    Ok(reads)
}

fn read_activity_track(path: &Path) -> Result<HashMap<(String, u32), f64>> {
    let mut track = HashMap::new();
    for (line_no, fields) in data_lines(path)? {
        let contig = field(&fields, 0, line_no)?.to_string();
        let position = parse_u32(&fields, 1, line_no)?;
        let raw = field(&fields, 2, line_no)?;
        let value: f64 = raw
            .parse()
            .with_context(|| format!("invalid activity '{}' on line {}", raw, line_no))?;
        track.insert((contig, position), value);
    }
    Ok(track)
}

/// Longest read the pileup reader materialises, start to pileup position.
const MAX_READ_SPAN: u32 = 100_000;

fn read_pileup(path: &Path, dict: &SequenceDictionary, location: GenomeLoc) -> Result<Pileup> {
    let contig = dict.contig(location.contig())?;
    let position = location.start();
    let mut groups: HashMap<(String, String, String), Arc<ReadGroup>> = HashMap::new();
    let mut elements = Vec::new();

    for (line_no, fields) in data_lines(path)? {
        let name = field(&fields, 0, line_no)?;
        let start = parse_u32(&fields, 1, line_no)?;
        if start == 0 || start > position {
            bail!("read start {} does not cover {} on line {}", start, location, line_no);
        }
        let len = position - start + 1;
        if len > MAX_READ_SPAN {
            bail!(
                "read spans {} bases to {} on line {} (limit {})",
                len,
                location,
                line_no,
                MAX_READ_SPAN
            );
        }
        let base = field(&fields, 2, line_no)?
            .bytes()
            .next()
            .ok_or_else(|| anyhow!("empty base on line {}", line_no))?;
        let quality = parse_u32(&fields, 3, line_no)?.min(u8::MAX as u32) as u8;
        let sample = field(&fields, 4, line_no)?.to_string();
        let library = field(&fields, 5, line_no)?.to_string();
        let platform_unit = field(&fields, 6, line_no)?.to_string();
        let reduced = matches!(fields.get(7).map(String::as_str), Some("1" | "true"));

        let group = groups
            .entry((sample.clone(), library.clone(), platform_unit.clone()))
            .or_insert_with(|| {
                let id = format!("{}.{}", sample, platform_unit);
                Arc::new(ReadGroup::new(id, sample, library, platform_unit))
            });

        let mut bases = vec![b'N'; len as usize];
        bases[len as usize - 1] = base.to_ascii_uppercase();
        let mut qualities = vec![0u8; len as usize];
        qualities[len as usize - 1] = quality;

        let read = AlignedRead::new(
            name,
            contig,
            start,
            vec![CigarOp::new(CigarOpKind::Match, len)],
            bases,
            qualities,
        )
        .with_read_group(Arc::clone(group))
        .with_reduced(reduced);
        elements.push(PileupElement::new(Arc::new(read), len as usize - 1));
    }

    Ok(Pileup::new(location, elements))
}

fn print_region(region: &ActiveRegion) {
    let reads: Vec<String> = region
        .assignments()
        .iter()
        .filter(|assignment| region.desired_read_states().contains(assignment.state))
        .map(|assignment| format!("{}:{}", assignment.read.name, assignment.state))
        .collect();
    println!(
        "{}\t{}\t{}\t{}",
        region.location(),
        if region.is_active() { "active" } else { "inactive" },
        region.extended_location(),
        if reads.is_empty() {
            ".".to_string()
        } else {
            reads.join(",")
        }
    );
}
