//! The accelerator client: the one component that owns the device
//! register map and walks the search protocol end to end.
//!
//! Everything here is generic over [`accel_bus::Transport`], so the same
//! `init`/`load_dictionary`/`verify_dictionary`/`search` sequence runs
//! unchanged against a real UART/SPI link or a simulated one.

use std::fmt;

use accel_bus::{Bus, BusError, Transport};
use accel_protocol::{MAX_PROBE_LEN, ProtocolError, RegisterMap, encode_probe};
use accel_types::{Revision, SearchResult};

/// Upper bound on how many times [`AcceleratorClient::search`] re-reads
/// the control register before giving up. Each iteration already costs
/// one bus round-trip, which is where the protocol's "small fixed time
/// quantum" between polls actually comes from - there is no separate
/// client-side sleep to get wrong.
pub const DEFAULT_POLL_BUDGET: u32 = 10_000;

/// Everything that can go wrong talking to the accelerator, grouped by
/// which layer raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// `load_dictionary`/`verify_dictionary` saw a word longer than the
    /// revision's per-word byte limit (255 on [`Revision::Wishbone`];
    /// unbounded, subject only to device capacity, on
    /// [`Revision::Direct`]).
    WordTooLong { word: String, limit: usize },
    /// `search` was called while the control register already showed an
    /// active search.
    SearchInProgress,
    /// The poll budget in `search` was exhausted before `active` cleared.
    Timeout,
    /// The device signalled its error flag (Wishbone revision only; the
    /// direct-register revision has no error flag and never raises this).
    DeviceError,
    /// `verify_dictionary` found a byte that didn't match the expected
    /// encoded image.
    DictionaryMismatch { addr: u32, got: u8, want: u8 },
    Bus(BusError),
    Protocol(ProtocolError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::WordTooLong { word, limit } => {
                write!(f, "word {word:?} exceeds the {limit}-byte per-word limit")
            }
            ClientError::SearchInProgress => {
                write!(f, "a search is already active on the device")
            }
            ClientError::Timeout => write!(f, "search poll budget exhausted"),
            ClientError::DeviceError => write!(f, "device signalled its error flag"),
            ClientError::DictionaryMismatch { addr, got, want } => write!(
                f,
                "dictionary mismatch at 0x{addr:06x}: expected 0x{want:02x}, got 0x{got:02x}"
            ),
            ClientError::Bus(inner) => write!(f, "{inner}"),
            ClientError::Protocol(inner) => write!(f, "{inner}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<BusError> for ClientError {
    fn from(err: BusError) -> Self {
        ClientError::Bus(err)
    }
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        ClientError::Protocol(err)
    }
}

/// Host-side driver for one accelerator instance, reached over one
/// [`Transport`]. Exclusively owns the device register map: nothing
/// else in the stack writes these addresses.
pub struct AcceleratorClient<T> {
    bus: Bus<T>,
    registers: RegisterMap,
    poll_budget: u32,
}

impl<T: Transport> AcceleratorClient<T> {
    /// Builds a client for `revision` over `transport`, using
    /// [`DEFAULT_POLL_BUDGET`] search polls before giving up.
    pub fn new(transport: T, revision: Revision) -> Self {
        Self::with_poll_budget(transport, revision, DEFAULT_POLL_BUDGET)
    }

    pub fn with_poll_budget(transport: T, revision: Revision, poll_budget: u32) -> Self {
        Self {
            bus: Bus::new(transport),
            registers: RegisterMap::for_revision(revision),
            poll_budget,
        }
    }

    #[must_use]
    pub fn revision(&self) -> Revision {
        self.registers.revision
    }

    pub fn into_inner(self) -> T {
        self.bus.into_inner()
    }

    /// Zeroes every entry of the 256-entry bitvector table. Safe to call
    /// repeatedly; after it returns the table is all zero, matching the
    /// invariant the search protocol relies on between searches.
    ///
    /// Writes one 2-byte entry at a time, mirroring the original
    /// accelerator driver's per-entry init loop; a transport is free to
    /// coalesce these into fewer physical frames, since the observable
    /// effect on the device is identical either way.
    pub async fn init(&mut self) -> Result<(), ClientError> {
        for symbol in 0u16..256 {
            let addr = self.registers.bitvector_address(symbol as u8);
            self.bus.write(addr, &[0, 0]).await?;
        }
        Ok(())
    }

    /// Writes `words` to the dictionary image in order: each word's raw
    /// bytes, then the revision's word terminator, then finally the
    /// list terminator. Does not read anything back.
    pub async fn load_dictionary<W: AsRef<[u8]>>(
        &mut self,
        words: &[W],
    ) -> Result<(), ClientError> {
        let image = self.encode_dictionary_image(words)?;
        self.bus
            .write(self.registers.base_dictionary_address, &image)
            .await?;
        Ok(())
    }

    /// Reads the dictionary region back and compares it byte-for-byte
    /// against the image `words` would encode to.
    pub async fn verify_dictionary<W: AsRef<[u8]>>(
        &mut self,
        words: &[W],
    ) -> Result<(), ClientError> {
        let expected = self.encode_dictionary_image(words)?;
        let mut actual = vec![0u8; expected.len()];
        self.bus
            .read(self.registers.base_dictionary_address, &mut actual)
            .await?;

        for (offset, (&want, &got)) in expected.iter().zip(actual.iter()).enumerate() {
            if want != got {
                return Err(ClientError::DictionaryMismatch {
                    addr: self.registers.base_dictionary_address + offset as u32,
                    got,
                    want,
                });
            }
        }
        Ok(())
    }

    /// Runs the full search protocol from §4.2: gate on `active`, encode
    /// and write the probe, start the search, poll to idle, read back
    /// the result, and restore the bitvector table to all-zero.
    pub async fn search(&mut self, probe: &[u8]) -> Result<SearchResult, ClientError> {
        let control = self.bus.read_byte(self.registers.control_address).await?;
        if control & self.registers.active_flag != 0 {
            return Err(ClientError::SearchInProgress);
        }

        let encoded = encode_probe(probe)?;

        for (&symbol, &vector) in &encoded.vectors {
            let addr = self.registers.bitvector_address(symbol);
            self.bus
                .write(addr, &[(vector >> 8) as u8, vector as u8])
                .await?;
        }

        if self.registers.requires_setup_scalars() {
            self.bus
                .write_byte(self.registers.length_address, encoded.length)
                .await?;
            self.bus
                .write(
                    self.registers.mask_address,
                    &[(encoded.mask >> 8) as u8, encoded.mask as u8],
                )
                .await?;
            self.bus
                .write(
                    self.registers.vp_address,
                    &[(encoded.vp >> 8) as u8, encoded.vp as u8],
                )
                .await?;
        }

        let start = self.registers.start_value(encoded.length);
        self.bus
            .write_byte(self.registers.control_address, start)
            .await?;

        let mut last_control = start;
        let mut idle = false;
        for _ in 0..self.poll_budget {
            last_control = self.bus.read_byte(self.registers.control_address).await?;
            if last_control & self.registers.active_flag == 0 {
                idle = true;
                break;
            }
        }
        if !idle {
            return Err(ClientError::Timeout);
        }
        if let Some(error_flag) = self.registers.error_flag
            && last_control & error_flag != 0
        {
            return Err(ClientError::DeviceError);
        }

        let distance = self.bus.read_byte(self.registers.distance_address).await?;
        let index_hi = self.bus.read_byte(self.registers.index_address).await?;
        let index_lo = self
            .bus
            .read_byte(self.registers.index_address + 1)
            .await?;
        let index = (u16::from(index_hi) << 8) | u16::from(index_lo);

        for &symbol in encoded.vectors.keys() {
            let addr = self.registers.bitvector_address(symbol);
            self.bus.write(addr, &[0, 0]).await?;
        }

        Ok(SearchResult { index, distance })
    }

    fn encode_dictionary_image<W: AsRef<[u8]>>(
        &self,
        words: &[W],
    ) -> Result<Vec<u8>, ClientError> {
        let mut image = Vec::new();
        for word in words {
            let word = word.as_ref();
            if let Some(limit) = self.registers.max_word_len
                && word.len() > limit
            {
                return Err(ClientError::WordTooLong {
                    word: String::from_utf8_lossy(word).into_owned(),
                    limit,
                });
            }
            image.extend_from_slice(word);
            image.push(self.registers.word_terminator);
        }
        image.push(self.registers.list_terminator);
        Ok(image)
    }
}

/// Re-exported so callers only need `accel-client` for the common
/// probe-length failure, without pulling in `accel-protocol` directly.
pub const MAX_PROBE_LENGTH: usize = MAX_PROBE_LEN;
