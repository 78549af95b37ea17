use foldhash::HashSet;

use crate::pal::{Platform, PlatformFacade};

/// One logical processor from the operating system's processor inventory.
///
/// Every field defaults to zero and is only filled in when the inventory reports a matching
/// field for the record. A record whose inventory block carries no core count therefore reports
/// `cores_per_socket() == 0`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LogicalProcessor {
    id: u32,
    socket_id: u32,
    sibling_count: u32,
    core_id: u32,
    cores_per_socket: u32,
}

impl LogicalProcessor {
    /// The OS-assigned ID of the logical processor. Unique, but not necessarily contiguous.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The physical package (socket) this processor belongs to.
    #[must_use]
    pub fn socket_id(&self) -> u32 {
        self.socket_id
    }

    /// The number of logical processors sharing this processor's socket, as reported by the OS.
    ///
    /// A malformed inventory may overcount; the value is recorded as-is.
    #[must_use]
    pub fn sibling_count(&self) -> u32 {
        self.sibling_count
    }

    /// The physical core within the socket.
    #[must_use]
    pub fn core_id(&self) -> u32 {
        self.core_id
    }

    /// The number of physical cores in this processor's socket.
    #[must_use]
    pub fn cores_per_socket(&self) -> u32 {
        self.cores_per_socket
    }
}

/// A one-time snapshot of the physical processor topology of the host machine.
///
/// Built by parsing the OS processor inventory (`/proc/cpuinfo` on Linux). The snapshot is
/// immutable once built; construct it once at startup and share it by reference.
///
/// A missing or unreadable inventory is not an error: the snapshot is then simply empty, with
/// zero processors, sockets and cores and an unknown clock speed. Callers get a degraded but
/// functional result instead of a failure.
///
/// # Example
///
/// ```
/// use one_per_core::CpuTopology;
///
/// let topology = CpuTopology::detect();
/// println!(
///     "{} logical processors on {} physical cores",
///     topology.processor_count(),
///     topology.total_physical_cores()
/// );
/// ```
#[derive(Clone, Debug, Default)]
pub struct CpuTopology {
    processors: Vec<LogicalProcessor>,
    clock_speed_mhz: u32,
    socket_count: u32,
    total_physical_cores: u32,
}

/// Inventory keys we recognize, matched case-sensitively by prefix so that keys padded with
/// trailing whitespace before the separator still match.
const KEY_PROCESSOR: &str = "processor";
const KEY_PHYSICAL_ID: &str = "physical id";
const KEY_SIBLINGS: &str = "siblings";
const KEY_CORE_ID: &str = "core id";
const KEY_CPU_CORES: &str = "cpu cores";
const KEY_MODEL_NAME: &str = "model name";

impl CpuTopology {
    /// Builds the snapshot from the processor inventory of the current system.
    ///
    /// Returns the empty snapshot if the inventory cannot be read (including on operating
    /// systems that do not expose one).
    #[must_use]
    pub fn detect() -> Self {
        Self::with_platform(&PlatformFacade::target())
    }

    pub(crate) fn with_platform(platform: &PlatformFacade) -> Self {
        platform
            .processor_inventory()
            .map(|contents| Self::from_inventory(&contents))
            .unwrap_or_default()
    }

    /// Builds the snapshot from inventory text in the `/proc/cpuinfo` format.
    ///
    /// The format is line-oriented `key : value` pairs, with a line containing no separator
    /// (typically a blank line) terminating the current record. Malformed lines are skipped and
    /// malformed numeric values are recorded as zero; parsing never fails.
    ///
    /// # Example
    ///
    /// ```
    /// use one_per_core::CpuTopology;
    ///
    /// let topology = CpuTopology::from_inventory("processor : 0\ncpu cores : 1\n");
    /// assert_eq!(topology.processor_count(), 1);
    /// assert_eq!(topology.total_physical_cores(), 1);
    /// ```
    #[must_use]
    pub fn from_inventory(contents: &str) -> Self {
        let mut topology = Self::default();

        // A terminator line only marks the end of the current record; the next record is
        // allocated lazily, once the next key/value line arrives.
        let mut in_record = false;

        for line in contents.lines() {
            match line.find(':') {
                None => in_record = false,
                Some(separator) => {
                    if !in_record {
                        topology.processors.push(LogicalProcessor::default());
                        in_record = true;
                    }

                    let key = &line[..separator];
                    let value = &line[separator.saturating_add(1)..];
                    topology.apply_field(key, value);
                }
            }
        }

        topology.compute_aggregates();
        topology
    }

    fn apply_field(&mut self, key: &str, value: &str) {
        let current = self
            .processors
            .last_mut()
            .expect("a record is always allocated before a field is applied");

        if key.starts_with(KEY_PROCESSOR) {
            current.id = parse_unsigned(value);
        } else if key.starts_with(KEY_PHYSICAL_ID) {
            current.socket_id = parse_unsigned(value);
        } else if key.starts_with(KEY_SIBLINGS) {
            current.sibling_count = parse_unsigned(value);
        } else if key.starts_with(KEY_CORE_ID) {
            current.core_id = parse_unsigned(value);
        } else if key.starts_with(KEY_CPU_CORES) {
            current.cores_per_socket = parse_unsigned(value);
        } else if key.starts_with(KEY_MODEL_NAME) {
            self.clock_speed_mhz = extract_clock_speed_mhz(value, self.clock_speed_mhz);
        }
    }

    /// Derives the socket and core aggregates from the processor list, in inventory order.
    ///
    /// The physical core total accumulates one `cpu cores` contribution per first-seen socket:
    /// whichever processor happens to be first in inventory order to report a new socket
    /// contributes its core count, and later processors of the same socket contribute nothing.
    /// This matches how OS-generated inventories group processors by socket; an inventory that
    /// interleaves sockets would be undercounted. Intentionally preserved as-is.
    fn compute_aggregates(&mut self) {
        let mut seen_sockets = HashSet::default();

        for processor in &self.processors {
            seen_sockets.insert(processor.socket_id);

            #[expect(
                clippy::cast_possible_truncation,
                reason = "socket count cannot exceed the processor record count"
            )]
            let unique_sockets = seen_sockets.len() as u32;

            if self.socket_count != unique_sockets {
                self.socket_count = unique_sockets;
                self.total_physical_cores = self
                    .total_physical_cores
                    .saturating_add(processor.cores_per_socket);
            }
        }
    }

    /// The logical processors in inventory order.
    #[must_use]
    pub fn processors(&self) -> &[LogicalProcessor] {
        &self.processors
    }

    /// The number of logical processors in the inventory.
    #[must_use]
    pub fn processor_count(&self) -> u32 {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "unrealistic to have more than u32::MAX processors"
        )]
        let count = self.processors.len() as u32;
        count
    }

    /// The processor clock speed in MHz, or 0 if it could not be determined.
    #[must_use]
    pub fn clock_speed_mhz(&self) -> u32 {
        self.clock_speed_mhz
    }

    /// The number of distinct physical packages (sockets) in the inventory.
    #[must_use]
    pub fn socket_count(&self) -> u32 {
        self.socket_count
    }

    /// The number of physical cores across all sockets.
    ///
    /// See [`CpuTopology::from_inventory`] for how this is derived from the inventory.
    #[must_use]
    pub fn total_physical_cores(&self) -> u32 {
        self.total_physical_cores
    }
}

/// Parses the leading unsigned integer of `text`, skipping leading whitespace.
///
/// Anything that does not start with a digit parses to 0, as does a value too large to
/// represent. Trailing non-digit content is ignored.
fn parse_unsigned(text: &str) -> u32 {
    let text = text.trim_start();
    let digits_end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());

    text[..digits_end].parse().unwrap_or(0)
}

/// Extracts the clock speed in MHz from a model name string such as
/// `Intel(R) Xeon(R) CPU E5-2680 v2 @ 2.80GHz`.
///
/// Extraction happens at most once per snapshot: once a non-zero speed is known, later model
/// names are ignored. The unit handling is a heuristic, not a strict parse: model names are
/// unit-inconsistent across vendors, so a value without a recognized unit is assumed to be in
/// GHz when below 100 and in MHz otherwise.
fn extract_clock_speed_mhz(model_name: &str, known_speed_mhz: u32) -> u32 {
    let Some(at) = model_name.find('@') else {
        return known_speed_mhz;
    };

    if known_speed_mhz != 0 {
        return known_speed_mhz;
    }

    let (speed, rest) = parse_float_prefix(&model_name[at.saturating_add(1)..]);
    let unit = rest.trim_start();

    let is_mhz = unit.starts_with("MHz");
    let is_ghz = unit.starts_with("GHz");
    let ghz_possible = speed < 100.0;

    let speed_mhz = if is_ghz || (ghz_possible && !is_mhz) {
        1000.0 * speed + 0.5
    } else {
        speed + 0.5
    };

    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "rounded-down nonnegative speed; out-of-range values saturate"
    )]
    let speed_mhz = speed_mhz as u32;
    speed_mhz
}

/// Parses the leading floating-point number of `text` after skipping leading whitespace,
/// returning the number and the unparsed remainder. Returns 0.0 when no number is present.
fn parse_float_prefix(text: &str) -> (f64, &str) {
    let text = text.trim_start();

    let mut end = 0;
    let mut seen_dot = false;

    for (index, c) in text.char_indices() {
        if c.is_ascii_digit() {
            end = index.saturating_add(1);
        } else if c == '.' && !seen_dot {
            seen_dot = true;
            end = index.saturating_add(1);
        } else {
            break;
        }
    }

    let value = text[..end].parse().unwrap_or(0.0);
    (value, &text[end..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inventory_yields_empty_snapshot() {
        let topology = CpuTopology::from_inventory("");

        assert!(topology.processors().is_empty());
        assert_eq!(topology.processor_count(), 0);
        assert_eq!(topology.socket_count(), 0);
        assert_eq!(topology.total_physical_cores(), 0);
        assert_eq!(topology.clock_speed_mhz(), 0);
    }

    #[test]
    fn parses_one_record_per_block() {
        let inventory = "\
processor\t: 0
physical id\t: 0
siblings\t: 8
core id\t: 0
cpu cores\t: 4

processor\t: 1
physical id\t: 0
siblings\t: 8
core id\t: 1
cpu cores\t: 4
";

        let topology = CpuTopology::from_inventory(inventory);

        assert_eq!(topology.processor_count(), 2);
        assert_eq!(topology.processors()[0].id(), 0);
        assert_eq!(topology.processors()[0].sibling_count(), 8);
        assert_eq!(topology.processors()[1].id(), 1);
        assert_eq!(topology.processors()[1].core_id(), 1);
    }

    #[test]
    fn last_value_before_terminator_wins() {
        let inventory = "\
processor : 0
core id : 1
core id : 2

processor : 1
";

        let topology = CpuTopology::from_inventory(inventory);

        assert_eq!(topology.processor_count(), 2);
        assert_eq!(topology.processors()[0].core_id(), 2);
    }

    #[test]
    fn keys_match_by_prefix() {
        // Inventory keys carry trailing whitespace before the separator; prefix matching
        // accepts them regardless.
        let topology = CpuTopology::from_inventory("processor\t\t: 5\ncpu cores\t: 2\n");

        assert_eq!(topology.processors()[0].id(), 5);
        assert_eq!(topology.processors()[0].cores_per_socket(), 2);
    }

    #[test]
    fn unrecognized_keys_are_ignored() {
        let inventory = "\
processor : 0
flags : fpu vme de pse
cache size : 8192 KB
";

        let topology = CpuTopology::from_inventory(inventory);

        assert_eq!(topology.processor_count(), 1);
        assert_eq!(topology.processors()[0], LogicalProcessor::default());
    }

    #[test]
    fn malformed_values_parse_to_zero() {
        let topology = CpuTopology::from_inventory("processor : abc\nsiblings : \n");

        assert_eq!(topology.processors()[0].id(), 0);
        assert_eq!(topology.processors()[0].sibling_count(), 0);
    }

    #[test]
    fn unset_fields_remain_zero() {
        let topology = CpuTopology::from_inventory("processor : 3\n");

        let processor = topology.processors()[0];
        assert_eq!(processor.id(), 3);
        assert_eq!(processor.socket_id(), 0);
        assert_eq!(processor.cores_per_socket(), 0);
    }

    #[test]
    fn clock_speed_from_ghz_model_name() {
        let topology = CpuTopology::from_inventory(
            "model name : Intel(R) Core(TM) i7-4770 CPU @ 2.40GHz\n",
        );

        assert_eq!(topology.clock_speed_mhz(), 2400);
    }

    #[test]
    fn clock_speed_without_unit_below_100_is_ghz() {
        let topology = CpuTopology::from_inventory("model name : Some CPU @ 2.4\n");

        assert_eq!(topology.clock_speed_mhz(), 2400);
    }

    #[test]
    fn clock_speed_from_mhz_model_name() {
        let topology = CpuTopology::from_inventory("model name : Some CPU @ 2400MHz\n");

        assert_eq!(topology.clock_speed_mhz(), 2400);
    }

    #[test]
    fn clock_speed_without_unit_at_or_above_100_is_mhz() {
        let topology = CpuTopology::from_inventory("model name : Some CPU @ 3300\n");

        assert_eq!(topology.clock_speed_mhz(), 3300);
    }

    #[test]
    fn first_nonzero_clock_speed_wins() {
        let inventory = "\
model name : First CPU @ 2.40GHz

model name : Second CPU @ 3.60GHz
";

        let topology = CpuTopology::from_inventory(inventory);

        assert_eq!(topology.clock_speed_mhz(), 2400);
    }

    #[test]
    fn zero_speed_extraction_does_not_block_later_attempts() {
        let inventory = "\
model name : Mystery CPU @ nonsense

model name : Real CPU @ 2.40GHz
";

        let topology = CpuTopology::from_inventory(inventory);

        assert_eq!(topology.clock_speed_mhz(), 2400);
    }

    #[test]
    fn model_name_without_at_sign_yields_no_speed() {
        let topology = CpuTopology::from_inventory("model name : AMD EPYC 7571\n");

        assert_eq!(topology.clock_speed_mhz(), 0);
    }

    #[test]
    fn socket_count_is_number_of_distinct_physical_ids() {
        let inventory = "\
processor : 0
physical id : 0

processor : 1
physical id : 0

processor : 2
physical id : 1
";

        let topology = CpuTopology::from_inventory(inventory);

        assert_eq!(topology.socket_count(), 2);
    }

    #[test]
    fn total_cores_counts_first_seen_socket_only() {
        // Only the first processor of each distinct socket contributes its core count.
        let inventory = "\
processor : 0
physical id : 0
cpu cores : 4

processor : 1
physical id : 0
cpu cores : 4

processor : 2
physical id : 1
cpu cores : 6
";

        let topology = CpuTopology::from_inventory(inventory);

        assert_eq!(topology.total_physical_cores(), 10);
    }

    #[test]
    fn interleaved_sockets_undercount_cores() {
        // Revisiting a socket after another one interleaved contributes nothing, even though
        // the revisiting processor reports a core count. Pins the documented accumulation
        // policy so it is not "fixed" by accident.
        let inventory = "\
processor : 0
physical id : 0
cpu cores : 4

processor : 1
physical id : 1
cpu cores : 6

processor : 2
physical id : 0
cpu cores : 4
";

        let topology = CpuTopology::from_inventory(inventory);

        assert_eq!(topology.socket_count(), 2);
        assert_eq!(topology.total_physical_cores(), 10);
    }

    #[test]
    fn parse_unsigned_is_lenient() {
        assert_eq!(parse_unsigned(" 42"), 42);
        assert_eq!(parse_unsigned("\t7\n"), 7);
        assert_eq!(parse_unsigned("12abc"), 12);
        assert_eq!(parse_unsigned("abc"), 0);
        assert_eq!(parse_unsigned(""), 0);
        assert_eq!(parse_unsigned("99999999999999999999"), 0);
    }

    #[test]
    fn parse_float_prefix_is_lenient() {
        assert_eq!(parse_float_prefix(" 2.4GHz"), (2.4, "GHz"));
        assert_eq!(parse_float_prefix("2400MHz"), (2400.0, "MHz"));
        assert_eq!(parse_float_prefix("x"), (0.0, "x"));
    }
}
