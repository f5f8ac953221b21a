/// Vulkan Debug Messenger - Routes validation layer messages to the engine logger
///
/// Statistics are always available; the messenger itself and the callback
/// only exist with the `vulkan-validation` feature.

use colored::*;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Global validation statistics (thread-safe atomic counters)
static VALIDATION_STATS: ValidationStatsTracker = ValidationStatsTracker::new();

/// Global message tracker for grouping identical messages
static MESSAGE_TRACKER: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Validation message counts since the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

/// Thread-safe validation statistics tracker
struct ValidationStatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl ValidationStatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
        }
    }

    fn get_stats(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.verbose.store(0, Ordering::Relaxed);
    }
}

/// Count one occurrence of `message`, returning how many times it was seen
#[cfg(any(test, feature = "vulkan-validation"))]
fn track_message(message: &str) -> u32 {
    let Ok(mut guard) = MESSAGE_TRACKER.lock() else {
        return 1;
    };
    let count = guard
        .get_or_insert_with(FxHashMap::default)
        .entry(message.to_string())
        .or_insert(0);
    *count += 1;
    *count
}

/// Current validation statistics
pub fn get_validation_stats() -> ValidationStats {
    VALIDATION_STATS.get_stats()
}

/// Reset statistics and the duplicate-message tracker
pub fn reset_validation_stats() {
    VALIDATION_STATS.reset();
    if let Ok(mut guard) = MESSAGE_TRACKER.lock() {
        *guard = None;
    }
}

/// Print validation statistics report
pub fn print_validation_stats_report() {
    let stats = get_validation_stats();

    if stats.total() == 0 {
        println!("\n{}", "No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());

    if stats.errors > 0 {
        println!("  {} {}", "Errors:".red().bold(), stats.errors);
    }
    if stats.warnings > 0 {
        println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
    }
    if stats.info > 0 {
        println!("  {} {}", "Info:".cyan(), stats.info);
    }
    if stats.verbose > 0 {
        println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
    }

    println!("  {} {}", "Total:".white().bold(), stats.total());

    if let Ok(guard) = MESSAGE_TRACKER.lock() {
        let duplicates = guard
            .as_ref()
            .map(|messages| messages.values().filter(|&&count| count > 1).count())
            .unwrap_or(0);
        if duplicates > 0 {
            println!("\n  {} message(s) appeared multiple times", duplicates);
        }
    }

    println!("{}\n", "====================================".bright_blue().bold());
}

#[cfg(feature = "vulkan-validation")]
pub(crate) use messenger::DebugMessenger;

#[cfg(feature = "vulkan-validation")]
mod messenger {
    use super::{track_message, VALIDATION_STATS};
    use ash::vk;
    use std::ffi::CStr;
    use std::sync::atomic::Ordering;
    use umbra_engine::umbra::config::DebugSeverity;
    use umbra_engine::umbra::{Error, Result};
    use umbra_engine::{engine_debug, engine_error, engine_info, engine_warn};

    /// Debug utils loader plus the messenger it created
    pub(crate) struct DebugMessenger {
        loader: ash::ext::debug_utils::Instance,
        messenger: vk::DebugUtilsMessengerEXT,
    }

    impl DebugMessenger {
        pub(crate) fn new(entry: &ash::Entry, instance: &ash::Instance, severity: DebugSeverity) -> Result<Self> {
            let loader = ash::ext::debug_utils::Instance::new(entry, instance);

            let info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                .message_severity(severity_flags(severity))
                .message_type(
                    vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                )
                .pfn_user_callback(Some(vulkan_debug_callback));

            let messenger = unsafe {
                loader.create_debug_utils_messenger(&info, None).map_err(|e| {
                    engine_error!("umbra::vulkan", "Failed to create debug messenger: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
                })?
            };

            super::reset_validation_stats();
            Ok(Self { loader, messenger })
        }

        /// Cleanup step that destroys this messenger, for bootstrap rollback
        pub(crate) fn rollback_step(&self) -> impl FnOnce() + 'static {
            let loader = self.loader.clone();
            let messenger = self.messenger;
            move || unsafe { loader.destroy_debug_utils_messenger(messenger, None) }
        }

        /// Destroy the messenger (must run before the instance is destroyed)
        pub(crate) fn destroy(self) {
            unsafe { self.loader.destroy_debug_utils_messenger(self.messenger, None) };
        }
    }

    fn severity_flags(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
        match severity {
            DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            DebugSeverity::ErrorsAndWarnings => {
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            }
            DebugSeverity::All => {
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
            }
        }
    }

    /// Vulkan debug messenger callback
    unsafe extern "system" fn vulkan_debug_callback(
        message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT,
        p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
        _user_data: *mut std::os::raw::c_void,
    ) -> vk::Bool32 {
        if p_callback_data.is_null() {
            return vk::FALSE;
        }
        let callback_data = *p_callback_data;
        let message_id_name = if callback_data.p_message_id_name.is_null() {
            "Unknown".into()
        } else {
            CStr::from_ptr(callback_data.p_message_id_name).to_string_lossy()
        };
        let message = if callback_data.p_message.is_null() {
            "No message".into()
        } else {
            CStr::from_ptr(callback_data.p_message).to_string_lossy()
        };

        let type_str = if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
            "Validation"
        } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
            "Performance"
        } else {
            "General"
        };

        let occurrences = track_message(&message);
        let repeat = if occurrences > 1 {
            format!(" [x{}]", occurrences)
        } else {
            String::new()
        };

        if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            VALIDATION_STATS.errors.fetch_add(1, Ordering::Relaxed);
            engine_error!("umbra::vulkan::validation", "[{}]{} {}: {}", type_str, repeat, message_id_name, message);
        } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            VALIDATION_STATS.warnings.fetch_add(1, Ordering::Relaxed);
            engine_warn!("umbra::vulkan::validation", "[{}]{} {}: {}", type_str, repeat, message_id_name, message);
        } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            VALIDATION_STATS.info.fetch_add(1, Ordering::Relaxed);
            engine_info!("umbra::vulkan::validation", "[{}] {}", type_str, message);
        } else {
            VALIDATION_STATS.verbose.fetch_add(1, Ordering::Relaxed);
            engine_debug!("umbra::vulkan::validation", "[{}] {}", type_str, message);
        }

        vk::FALSE
    }
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
