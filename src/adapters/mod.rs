//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements            | Connects to                 |
//! |----------------|-----------------------|-----------------------------|
//! | `config_file`  | ConfigPort            | JSON file on disk           |
//! | `console`      | —                     | stdin request lines         |
//! | `farm`         | all four farm ports   | composes the adapters below |
//! | `kv_store`     | ActuatorStateStore    | namespaced blob store       |
//! |                | ConfigPort            |                             |
//! | `log_sink`     | EventSink             | `log` facade                |
//! | `memory`       | SensorGateway         | shared latest reading       |
//! |                | CropProfileStore      | shared crop table           |
//! | `mqtt`         | CommandPublisher      | broker via MessageTransport |
//! | `relay`        | CommandPublisher      | embedded-hal GPIO relays    |
//! | `sensor_feed`  | —                     | device JSON payloads        |
//! | `time`         | Clock                 | system / manual clock       |

pub mod config_file;
pub mod console;
pub mod farm;
pub mod kv_store;
pub mod log_sink;
pub mod memory;
pub mod mqtt;
pub mod relay;
pub mod sensor_feed;
pub mod time;
