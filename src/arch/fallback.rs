/// Hosted targets have no handler mode; the kernel reports ISR misuse itself.
pub fn in_isr() -> bool {
    false
}
