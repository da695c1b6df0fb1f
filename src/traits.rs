use embedded_io::Error;

/// Serial channel capability required by the protocol engine.
///
/// The SIM800 sits on a plain asynchronous UART with no flow control and
/// no framing, so the engine only needs three primitives: write bytes,
/// report how many received bytes are pending, and hand pending bytes
/// out. Implementations are injected by the host platform; the crate
/// never reaches for platform globals.
pub trait SerialPort {
    type Error: Error;

    /// Write the whole buffer to the module.
    fn write(&mut self, buf: &[u8]) -> Result<(), Self::Error>;

    /// Number of received bytes that can be read without blocking.
    fn available(&mut self) -> Result<usize, Self::Error>;

    /// Copy pending bytes into `buf`, returning how many were copied.
    /// Must not block when nothing is pending.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

impl<T: SerialPort> SerialPort for &mut T {
    type Error = T::Error;

    fn write(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        T::write(self, buf)
    }

    fn available(&mut self) -> Result<usize, Self::Error> {
        T::available(self)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        T::read(self, buf)
    }
}
