use std::collections::BTreeMap;
use std::sync::Arc;

use bitvec::prelude::*;
use tracing::{debug, trace, warn};

use crate::downsampling::{IndexSampler, RemovalLog};
use crate::genomics::{simple_base_index, AlignedRead, Allele, Pileup, PileupElement, NUM_BASES};

/// Downsamples reads per supported allele so no allele is favoured.
///
/// Every allele stratum loses the same absolute number of reads,
/// `floor(total * fraction)`, computed over the whole input. Strata no
/// larger than that number are removed entirely.
///
/// Each call writes its removed reads to the removal log as one batch, in
/// removal order (stratum by stratum, input order within a stratum).
#[derive(Debug)]
pub struct AlleleBiasedDownsampler<S> {
    sampler: S,
    removal_log: Option<RemovalLog>,
}

impl<S: IndexSampler> AlleleBiasedDownsampler<S> {
    /// Downsampler drawing its random subsets from `sampler`.
    pub fn new(sampler: S) -> Self {
        Self {
            sampler,
            removal_log: None,
        }
    }

    /// Report every removed read to `log`.
    pub fn with_removal_log(mut self, log: RemovalLog) -> Self {
        self.removal_log = Some(log);
        self
    }

    /// Attached audit log, if any.
    pub fn removal_log(&self) -> Option<&RemovalLog> {
        self.removal_log.as_ref()
    }

    /// Allele-biased copy of `pileup` holding the elements to KEEP.
    ///
    /// * `fraction <= 0` returns the pileup unchanged.
    /// * `fraction >= 1` returns an empty pileup at the same locus.
    /// * A pileup containing any reduced read is returned unchanged.
    ///
    /// Elements with a non-canonical base never appear in the result. The
    /// kept elements are ordered by `(alignment start, read name)`; two
    /// elements sharing both keys collapse into the first one seen.
    pub fn downsample_pileup(&mut self, pileup: &Pileup, fraction: f64) -> Pileup {
        if fraction.is_nan() {
            warn!(locus = %pileup.location(), "NaN downsampling fraction, pileup left unchanged");
            return pileup.clone();
        }
        if fraction <= 0.0 {
            return pileup.clone();
        }
        if fraction >= 1.0 {
            return Pileup::empty(pileup.location().clone());
        }
        if pileup.has_reduced_reads() {
            debug!(locus = %pileup.location(), "pileup holds reduced reads, skipping downsampling");
            return pileup.clone();
        }

        let mut strata: [Vec<&PileupElement>; NUM_BASES] = Default::default();
        for element in pileup {
            if let Some(idx) = simple_base_index(element.base()) {
                strata[idx].push(element);
            }
        }

        let num_to_remove = (pileup.len() as f64 * fraction).floor() as usize;
        let mut kept: BTreeMap<(u32, Arc<str>), PileupElement> = BTreeMap::new();
        let mut removed_reads: Vec<&AlignedRead> = Vec::new();

        for stratum in &strata {
            if stratum.len() <= num_to_remove {
                removed_reads.extend(stratum.iter().map(|element| Arc::as_ref(element.read())));
                continue;
            }

            let removed = self.removal_mask(stratum.len(), num_to_remove);
            for (element, remove) in stratum.iter().zip(removed.iter().by_vals()) {
                if remove {
                    removed_reads.push(Arc::as_ref(element.read()));
                } else {
                    let read = element.read();
                    kept.entry((read.start, Arc::clone(&read.name)))
                        .or_insert_with(|| (*element).clone());
                }
            }
        }
        self.log_removed(removed_reads);

        trace!(
            locus = %pileup.location(),
            input = pileup.len(),
            kept = kept.len(),
            num_to_remove,
            "downsampled pileup"
        );

        Pileup::new(pileup.location().clone(), kept.into_values().collect())
    }

    /// Reads to REMOVE from an allele-to-reads map.
    ///
    /// The inverse convention of [`downsample_pileup`](Self::downsample_pileup):
    /// callers drop the returned reads themselves. Alleles are visited in map
    /// order; reads within an allele keep their list order. The fraction is
    /// clamped to `[0, 1]`, with NaN treated as 0.
    pub fn select_reads_to_remove(
        &mut self,
        allele_reads: &BTreeMap<Allele, Vec<Arc<AlignedRead>>>,
        fraction: f64,
    ) -> Vec<Arc<AlignedRead>> {
        let fraction = if fraction.is_nan() {
            warn!("NaN downsampling fraction, no reads selected for removal");
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };

        let total: usize = allele_reads.values().map(Vec::len).sum();
        let num_to_remove = (total as f64 * fraction).floor() as usize;
        let mut to_remove = Vec::with_capacity(num_to_remove * allele_reads.len());

        for reads in allele_reads.values() {
            if reads.len() <= num_to_remove {
                to_remove.extend(reads.iter().cloned());
                continue;
            }

            let removed = self.removal_mask(reads.len(), num_to_remove);
            to_remove.extend(
                reads
                    .iter()
                    .zip(removed.iter().by_vals())
                    .filter_map(|(read, remove)| remove.then(|| Arc::clone(read))),
            );
        }
        self.log_removed(to_remove.iter().map(Arc::as_ref));

        debug!(
            alleles = allele_reads.len(),
            total,
            num_to_remove,
            removed = to_remove.len(),
            "selected allele-biased reads for removal"
        );
        to_remove
    }

    fn removal_mask(&mut self, len: usize, num_to_remove: usize) -> BitVec {
        let mut mask = bitvec![0; len];
        for idx in self.sampler.sample_indices(len, num_to_remove) {
            if idx < len {
                mask.set(idx, true);
            }
        }
        debug_assert_eq!(mask.count_ones(), num_to_remove.min(len));
        mask
    }

    fn log_removed<'a>(&self, reads: impl IntoIterator<Item = &'a AlignedRead>) {
        if let Some(log) = &self.removal_log {
            log.record_all(reads);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downsampling::RandomIndexSampler;
    use crate::genomics::CigarOp;
    use crate::genomics::CigarOpKind;
    use crate::locus::{Contig, GenomeLoc, SequenceDictionary};

    /// Always removes the first `k` indices.
    struct TakeFirst;

    impl IndexSampler for TakeFirst {
        fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
            (0..k.min(n)).collect()
        }
    }

    fn contig() -> (SequenceDictionary, Contig, GenomeLoc) {
        let dict = SequenceDictionary::new([("1", 10_000)]);
        let contig = dict.contig("1").unwrap().clone();
        let locus = dict.loc("1", 500, 500).unwrap();
        (dict, contig, locus)
    }

    fn element(contig: &Contig, name: &str, start: u32, base: u8) -> PileupElement {
        let offset = (500 - start) as usize;
        let mut bases = vec![b'A'; offset + 1];
        bases[offset] = base;
        let len = bases.len() as u32;
        let read = AlignedRead::new(
            name,
            contig,
            start,
            vec![CigarOp::new(CigarOpKind::Match, len)],
            bases,
            vec![30; len as usize],
        );
        PileupElement::new(Arc::new(read), offset)
    }

    fn stratified_pileup(sizes: [usize; 4]) -> Pileup {
        let (_, contig, locus) = contig();
        let mut elements = Vec::new();
        for (base, size) in [b'A', b'C', b'G', b'T'].into_iter().zip(sizes) {
            for i in 0..size {
                let name = format!("{}{}", base as char, i);
                elements.push(element(&contig, &name, 400 + i as u32, base));
            }
        }
        Pileup::new(locus, elements)
    }

    #[test]
    fn stratum_floor_rule_applies_same_count_to_every_allele() {
        // 18 elements * 0.17 = 3.06 -> 3 removed from each stratum.
        let pileup = stratified_pileup([2, 5, 1, 10]);
        let mut downsampler = AlleleBiasedDownsampler::new(RandomIndexSampler::from_seed_u64(3));
        let result = downsampler.downsample_pileup(&pileup, 0.17);
        assert_eq!(result.base_counts(), [0, 2, 0, 7]);
    }

    #[test]
    fn non_canonical_bases_are_dropped() {
        let (_, contig, locus) = contig();
        let pileup = Pileup::new(
            locus,
            vec![
                element(&contig, "a", 450, b'A'),
                element(&contig, "n", 451, b'N'),
                element(&contig, "c", 452, b'C'),
            ],
        );
        let mut downsampler = AlleleBiasedDownsampler::new(TakeFirst);
        // floor(3 * 0.1) = 0: nothing sampled, but N still disappears.
        let result = downsampler.downsample_pileup(&pileup, 0.1);
        let names: Vec<&str> = result.iter().map(|e| e.read().name.as_ref()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn kept_elements_sorted_and_deduplicated_by_start_and_name() {
        let (_, contig, locus) = contig();
        let pileup = Pileup::new(
            locus,
            vec![
                element(&contig, "z", 410, b'G'),
                element(&contig, "b", 420, b'A'),
                element(&contig, "a", 420, b'A'),
                element(&contig, "a", 420, b'C'),
            ],
        );
        let mut downsampler = AlleleBiasedDownsampler::new(TakeFirst);
        let result = downsampler.downsample_pileup(&pileup, 0.2);
        let keys: Vec<(u32, &str, u8)> = result
            .iter()
            .map(|e| (e.read().start, e.read().name.as_ref(), e.base()))
            .collect();
        assert_eq!(keys, vec![(410, "z", b'G'), (420, "a", b'A'), (420, "b", b'A')]);
    }

    #[test]
    fn select_reads_returns_small_alleles_whole() {
        let (_, contig, _) = contig();
        let reads = |prefix: &str, n: usize| -> Vec<Arc<AlignedRead>> {
            (0..n)
                .map(|i| {
                    Arc::new(AlignedRead::matching(
                        format!("{prefix}{i}"),
                        &contig,
                        100 + i as u32,
                        200,
                    ))
                })
                .collect()
        };
        let mut map = BTreeMap::new();
        map.insert(Allele::reference(b"A"), reads("ref", 3));
        map.insert(Allele::alternate(b"T"), reads("alt", 10));

        let mut downsampler = AlleleBiasedDownsampler::new(TakeFirst);
        // 13 reads * 0.33 = 4.29 -> 4
        let removed = downsampler.select_reads_to_remove(&map, 0.33);
        let names: Vec<&str> = removed.iter().map(|r| r.name.as_ref()).collect();
        // Alleles are visited in map order: "A" sorts before "T".
        assert_eq!(names, vec!["ref0", "ref1", "ref2", "alt0", "alt1", "alt2", "alt3"]);
    }
}
