pub mod metrics;
pub mod record;
pub mod system;
pub mod user;

use super::registry::CommandRegistry;

pub fn register_all(registry: &mut CommandRegistry) {
    for entry in record::definitions()
        .into_iter()
        .chain(metrics::definitions())
        .chain(user::definitions())
        .chain(system::definitions())
    {
        registry.register(entry);
    }
}
