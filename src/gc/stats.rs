//! GC statistics and their two textual dump forms (spec.md §6).

use core::fmt;

/// Counters maintained for a single generation (nursery or tenured).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PerGenerationStatistics {
    /// Bytes currently live in this generation's active space.
    pub used_z: u64,
    /// Number of GC cycles that touched this generation.
    pub n_gc: u64,
    /// Bytes allocated since the generation was last collected.
    pub new_alloc_z: u64,
    /// Bytes the collector has scanned (copied + `forward_children`ed) this cycle.
    pub scanned_z: u64,
    /// Bytes that survived the most recent cycle.
    pub survive_z: u64,
    /// Bytes promoted out of this generation during the most recent cycle.
    pub promote_z: u64,
}

impl PerGenerationStatistics {
    fn write_pretty(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        writeln!(f, "{indent}<PerGenerationStatistics")?;
        writeln!(f, "{indent}    :used_z {}", self.used_z)?;
        writeln!(f, "{indent}    :n_gc {}", self.n_gc)?;
        writeln!(f, "{indent}    :new_alloc_z {}", self.new_alloc_z)?;
        writeln!(f, "{indent}    :scanned_z {}", self.scanned_z)?;
        writeln!(f, "{indent}    :survive_z {}", self.survive_z)?;
        write!(f, "{indent}    :promote_z {}>", self.promote_z)
    }

    fn write_compact(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<PerGenerationStatistics :used_z {} :n_gc {} :new_alloc_z {} :scanned_z {} :survive_z {} :promote_z {}>",
            self.used_z, self.n_gc, self.new_alloc_z, self.scanned_z, self.survive_z, self.promote_z
        )
    }
}

/// Whole-collector statistics: one [`PerGenerationStatistics`] per
/// generation plus the crosscutting mutation counters from spec.md §4.2's
/// "Observable metrics".
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GcStatistics {
    /// `[nursery, tenured]`.
    pub gen_v: [PerGenerationStatistics; 2],
    /// Total bytes ever allocated across both generations.
    pub total_allocated: u64,
    /// Sum of bytes promoted into tenured, across the object's two
    /// semi-space lifetimes (spec.md's `total_promoted_sab`: bytes
    /// promoted "same as before", i.e. double-counted across from/to).
    pub total_promoted_sab: u64,
    /// Bytes promoted into tenured (de-duplicated).
    pub total_promoted: u64,
    /// Total `assign_member` calls observed.
    pub n_mutation: u64,
    /// `assign_member` calls that were appended to the write-barrier log.
    pub n_logged_mutation: u64,
    /// Logged mutations whose parent and value live in different generations.
    pub n_xgen_mutation: u64,
    /// Logged mutations whose parent and value straddle a checkpoint.
    pub n_xckp_mutation: u64,
}

/// A wrapper requesting the single-line compact rendering of
/// [`GcStatistics`], since `Display` on the struct itself is the
/// pretty-printed multi-line form.
pub struct Compact<'a>(pub &'a GcStatistics);

impl fmt::Display for GcStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<GcStatistics")?;
        writeln!(f, "  :gen_v")?;
        write!(f, "    [ ")?;
        self.gen_v[0].write_pretty(f, "")?;
        writeln!(f, ",")?;
        write!(f, "      ")?;
        self.gen_v[1].write_pretty(f, "")?;
        writeln!(f, " ]")?;
        writeln!(f, "  :total_allocated {}", self.total_allocated)?;
        writeln!(f, "  :total_promoted_sab {}", self.total_promoted_sab)?;
        writeln!(f, "  :total_promoted {}", self.total_promoted)?;
        writeln!(f, "  :n_mutation {}", self.n_mutation)?;
        writeln!(f, "  :n_logged_mutation {}", self.n_logged_mutation)?;
        writeln!(f, "  :n_xgen_mutation {}", self.n_xgen_mutation)?;
        write!(f, "  :n_xckp_mutation {}>", self.n_xckp_mutation)
    }
}

impl<'a> fmt::Display for Compact<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0;
        write!(f, "<GcStatistics :gen_v [ ")?;
        s.gen_v[0].write_compact(f)?;
        write!(f, ", ")?;
        s.gen_v[1].write_compact(f)?;
        write!(
            f,
            " ] :total_allocated {} :total_promoted_sab {} :total_promoted {} :n_mutation {} :n_logged_mutation {} :n_xgen_mutation {} :n_xckp_mutation {}>",
            s.total_allocated,
            s.total_promoted_sab,
            s.total_promoted,
            s.n_mutation,
            s.n_logged_mutation,
            s.n_xgen_mutation,
            s.n_xckp_mutation
        )
    }
}

impl GcStatistics {
    /// The multi-line, indented form (identical to `Display`, named to
    /// match spec.md §6's "pretty-printed" label explicitly).
    pub fn to_pretty_string(&self) -> String {
        self.to_string()
    }

    /// The single-line, whitespace-minimized form.
    pub fn to_compact_string(&self) -> String {
        Compact(self).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_and_compact_carry_identical_keys() {
        let stats = GcStatistics::default();
        let pretty = stats.to_pretty_string();
        let compact = stats.to_compact_string();
        for key in [
            ":used_z", ":n_gc", ":new_alloc_z", ":scanned_z", ":survive_z", ":promote_z",
            ":total_allocated", ":total_promoted_sab", ":total_promoted", ":n_mutation",
            ":n_logged_mutation", ":n_xgen_mutation", ":n_xckp_mutation",
        ] {
            assert!(pretty.contains(key), "pretty missing {key}");
            assert!(compact.contains(key), "compact missing {key}");
        }
        assert!(!compact.contains('\n'));
    }
}
