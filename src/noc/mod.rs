pub mod codec;
pub mod link;
pub mod mesh;
pub mod socket;
pub mod trace;

pub use codec::{tile_address, coordinate_address, AddressEncoding, NocAddress, TileId, TileSelector};
pub use link::NocLink;
pub use mesh::SimulatedMesh;
pub use socket::{SocketLink, SocketServer};
pub use trace::TraceLink;
