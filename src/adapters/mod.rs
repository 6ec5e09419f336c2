//! Host adapters: concrete implementations of the port traits.
//!
//! | Adapter                 | Port               | Backing                        |
//! |-------------------------|--------------------|--------------------------------|
//! | `TimedPwmOutput`        | `ContinuousOutput` | `embedded_hal::pwm`            |
//! | `TimedDigitalOutput`    | `BinaryOutput`     | `embedded_hal::digital`        |
//! | `PolledPresenceSensor`  | `SensorWatcher`    | `embedded_hal::digital`        |
//! | `PinRegistry`           | `PinFactory`       | name → channel map             |
//! | `SimReactor`            | `TimerService`     | fixed-slot virtual-time queue  |
//! | `LinearClock`           | `Clock`            | `offset + t * rate`            |

pub mod hal_output;
pub mod hal_sensor;
pub mod pins;
pub mod reactor;
pub mod time;
