#[allow(unused_imports)]
use crate::OneWireSearch;

/// One wire communication error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneWireError<E> {
    /// Encapsulates the error type from the underlying hardware.
    Other(E),
    /// Indicates that no device is present on the bus.
    ///
    /// A [`OneWireSearch`] treats this as the end of the pass rather than an error.
    NoDevicePresent,
    /// Indicates that the bus is busy, which may happen if a device is already communicating.
    BusInUse,
    /// Indicates that a short circuit was detected on the bus.
    ShortCircuit,
    /// Indicates that the operation is not implemented by the transport, such as reading a triplet.
    Unimplemented,
}

impl<E> From<E> for OneWireError<E> {
    fn from(other: E) -> Self {
        Self::Other(other)
    }
}
