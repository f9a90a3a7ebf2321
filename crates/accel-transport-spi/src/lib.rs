//! SPI transport: the host shifts out a 32-bit command word MSB-first,
//! polls MISO for a ready marker, then shifts in an 8-bit response.
//! Chip-select is active-low for the whole frame.
//!
//! Two backends: a real one bit-banging an FTDI MPSSE engine (an
//! icestick-style USB-to-SPI bridge), gated behind the `hardware`
//! feature so the simulated-only path never needs `libftdi1` to link,
//! and a simulated one paced by `accel-sim` against an in-process
//! `AcceleratorCore`, same as `accel-transport-uart`'s simulated
//! backend.

use std::cell::RefCell;
use std::rc::Rc;

use accel_bus::{Operation, Transport, TransportError};
use accel_sim::{AcceleratorCore, Harness, NullDevice};
use accel_types::{ChipSelect, Revision};

/// Encodes one bus command as the 32-bit word shifted MSB-first:
/// identical bit layout to the UART frame, just concatenated.
#[must_use]
pub fn encode_command(operation: Operation, address: u32, value: u8) -> u32 {
    let write_bit = if operation == Operation::Write { 0x80 } else { 0x00 };
    let byte0 = write_bit | ((address >> 16) as u8 & 0x7F);
    (u32::from(byte0) << 24) | ((address & 0xFFFF) << 8) | u32::from(value)
}

/// Upper bound on ready-poll iterations before giving up.
pub const DEFAULT_POLL_BUDGET: u32 = 10_000;

#[cfg(feature = "hardware")]
mod mpsse {
    pub const SET_BITS_LOW: u8 = 0x80;
    pub const MPSSE_WRITE_NEG: u8 = 0x01;
    pub const MPSSE_BITMODE: u8 = 0x02;
    pub const MPSSE_READ_NEG: u8 = 0x04;
    pub const MPSSE_DO_READ: u8 = 0x20;
    pub const MPSSE_DO_WRITE: u8 = 0x10;

    #[derive(Debug, Clone, Copy)]
    pub enum Pin {
        Sck = 1 << 0,
        Mosi = 1 << 1,
        Miso = 1 << 2,
        Ss = 1 << 3,
        Ss2 = 1 << 4,
        Ss3 = 1 << 5,
    }
}

/// Real SPI transport over an FTDI MPSSE engine (e.g. an iCEstick's
/// onboard FT2232H), addressed via `libftdi1` bindings. Only built with
/// the `hardware` feature enabled.
#[cfg(feature = "hardware")]
pub struct RealSpi {
    device: ftdi::Device,
    chip_select: ChipSelect,
    poll_budget: u32,
    initialized: bool,
}

#[cfg(feature = "hardware")]
impl RealSpi {
    pub fn open(chip_select: ChipSelect) -> Result<Self, TransportError> {
        let device = ftdi::find_by_vid_pid(0x0403, 0x6010)
            .interface(ftdi::Interface::B)
            .open()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(Self {
            device,
            chip_select,
            poll_budget: DEFAULT_POLL_BUDGET,
            initialized: false,
        })
    }

    fn ensure_initialized(&mut self) -> Result<(), TransportError> {
        if self.initialized {
            return Ok(());
        }
        self.device
            .usb_reset()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        self.device
            .set_bitmode(0, ftdi::BitMode::Reset)
            .map_err(|e| TransportError::Io(e.to_string()))?;
        self.device
            .set_bitmode(0, ftdi::BitMode::Mpsse)
            .map_err(|e| TransportError::Io(e.to_string()))?;
        self.device
            .usb_purge_buffers()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        self.initialized = true;
        Ok(())
    }

    /// Idle line levels for the frame, selecting which of the memory-side
    /// chip-select pins (if any) this client drives high between frames.
    fn idle_bits(&self) -> u8 {
        use mpsse::Pin;
        let mut bits = Pin::Sck as u8 | Pin::Mosi as u8 | Pin::Ss as u8;
        bits |= match self.chip_select {
            ChipSelect::None | ChipSelect::Cs => 0,
            ChipSelect::Cs2 => Pin::Ss2 as u8,
            ChipSelect::Cs3 => Pin::Ss3 as u8,
        };
        bits
    }
}

#[cfg(feature = "hardware")]
impl Transport for RealSpi {
    async fn execute(
        &mut self,
        operation: Operation,
        address: u32,
        value: u8,
    ) -> Result<u8, TransportError> {
        use mpsse::{MPSSE_BITMODE, MPSSE_DO_READ, MPSSE_DO_WRITE, MPSSE_READ_NEG, MPSSE_WRITE_NEG, Pin, SET_BITS_LOW};
        use std::io::{Read, Write};

        self.ensure_initialized()?;

        let command = encode_command(operation, address, value);
        let idle = self.idle_bits();

        let write_commands = [
            SET_BITS_LOW,
            0,
            idle,
            MPSSE_DO_WRITE | MPSSE_WRITE_NEG,
            3,
            0,
            (command >> 24) as u8,
            (command >> 16) as u8,
            (command >> 8) as u8,
            command as u8,
        ];
        self.device
            .write_all(&write_commands)
            .map_err(|e| TransportError::Io(e.to_string()))?;

        let poll_command = [MPSSE_DO_READ | MPSSE_BITMODE | MPSSE_READ_NEG, 0, 0];
        let mut ready = [0u8; 1];
        let mut acknowledged = false;
        for _ in 0..self.poll_budget {
            self.device
                .write_all(&poll_command)
                .map_err(|e| TransportError::Io(e.to_string()))?;
            self.device
                .read_exact(&mut ready)
                .map_err(|e| TransportError::Io(e.to_string()))?;
            if ready[0] & Pin::Miso as u8 != 0 {
                acknowledged = true;
                break;
            }
        }
        if !acknowledged {
            return Err(TransportError::Timeout);
        }

        let read_commands = [
            MPSSE_DO_READ | MPSSE_READ_NEG,
            0,
            0,
            SET_BITS_LOW,
            Pin::Ss as u8,
            idle,
        ];
        self.device
            .write_all(&read_commands)
            .map_err(|e| TransportError::Io(e.to_string()))?;
        let mut response = [0u8; 1];
        self.device
            .read_exact(&mut response)
            .map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(response[0])
    }
}

/// Simulated SPI transport, paced the same way as
/// `accel_transport_uart::SimulatedUart`: transmission latency is
/// modeled with `next_event` ticks rather than bit-banged SCK/MOSI/MISO
/// edges.
pub struct SimulatedSpi {
    harness: Harness<NullDevice>,
    core: Rc<RefCell<AcceleratorCore>>,
    poll_budget: u32,
}

impl SimulatedSpi {
    #[must_use]
    pub fn new(revision: Revision) -> Self {
        Self {
            harness: Harness::new(NullDevice),
            core: Rc::new(RefCell::new(AcceleratorCore::new(revision))),
            poll_budget: DEFAULT_POLL_BUDGET,
        }
    }

    #[must_use]
    pub fn core(&self) -> Rc<RefCell<AcceleratorCore>> {
        Rc::clone(&self.core)
    }
}

impl Transport for SimulatedSpi {
    async fn execute(
        &mut self,
        operation: Operation,
        address: u32,
        value: u8,
    ) -> Result<u8, TransportError> {
        // 32 command bits plus one idle period before the ready poll
        // begins; the simulated device always answers on the first
        // poll since `AcceleratorCore::execute` is synchronous.
        for _ in 0..33 {
            self.harness.next_event().await;
        }
        let _ = self.poll_budget;
        Ok(self.core.borrow_mut().execute(operation, address, value))
    }
}
