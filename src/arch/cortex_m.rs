use cortex_m::peripheral::scb::VectActive;
use cortex_m::peripheral::SCB;

/// true while executing an exception or interrupt handler
pub fn in_isr() -> bool {
    SCB::vect_active() != VectActive::ThreadMode
}
