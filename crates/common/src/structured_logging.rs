use serde::{Serialize, Deserialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{Level, Event, Subscriber};
use tracing::field::{Field, Visit};
use tracing_subscriber::{fmt, layer::SubscriberExt, Layer, EnvFilter, Registry};
use tracing_subscriber::fmt::format::FmtSpan;
use std::io::{self, Write};
use chrono::Utc;

/// Структурированная запись лога в JSON формате
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredLogEntry {
    /// Временная метка в ISO 8601 формате
    pub timestamp: String,
    /// Уровень логирования
    pub level: String,
    /// Целевой модуль/компонент
    pub target: String,
    /// Основное сообщение
    pub message: String,
    /// Дополнительные поля
    #[serde(flatten)]
    pub fields: HashMap<String, Value>,
    /// Контекст выполнения
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ExecutionContext>,
    /// Метрики производительности
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceMetrics>,
}

/// Контекст выполнения для отслеживания
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// ID запроса/сессии
    pub request_id: Option<String>,
    /// Имя пользователя
    pub user_id: Option<String>,
    /// Версия приложения
    pub app_version: String,
    /// Имя хоста
    pub hostname: String,
    /// ID процесса
    pub pid: u32,
    /// ID потока
    pub thread_id: String,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            request_id: None,
            user_id: None,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            hostname: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
            thread_id: format!("{:?}", std::thread::current().id()),
        }
    }
}

/// Метрики производительности
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Длительность операции в миллисекундах
    pub duration_ms: u64,
    /// Использование памяти в байтах
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_used_bytes: Option<u64>,
    /// Использование CPU в процентах
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_usage_percent: Option<f32>,
    /// Количество операций ввода-вывода
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_operations: Option<u64>,
    /// Попадания в кэш
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_hits: Option<u64>,
    /// Промахи кэша
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_misses: Option<u64>,
}

/// Форматтер для JSON логов
pub struct JsonFormatter;

impl<S> Layer<S> for JsonFormatter
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        
        let level = match *event.metadata().level() {
            Level::ERROR => "ERROR",
            Level::WARN => "WARN",
            Level::INFO => "INFO",
            Level::DEBUG => "DEBUG",
            Level::TRACE => "TRACE",
        };
        
        let performance = visitor.extract_performance_metrics();
        
        let entry = StructuredLogEntry {
            timestamp: Utc::now().to_rfc3339(),
            level: level.to_string(),
            target: event.metadata().target().to_string(),
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
            context: Some(ExecutionContext::default()),
            performance,
        };
        
        if let Ok(json) = serde_json::to_string(&entry) {
            let _ = writeln!(io::stdout(), "{}", json);
        }
    }
}

/// Визитор для извлечения полей из события
#[derive(Default)]
struct JsonVisitor {
    message: Option<String>,
    fields: HashMap<String, Value>,
}

impl Visit for JsonVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(
                field.name().to_string(),
                Value::String(format!("{:?}", value)),
            );
        }
    }
    
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.insert(
                field.name().to_string(),
                Value::String(value.to_string()),
            );
        }
    }
    
    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(
            field.name().to_string(),
            Value::Number(value.into()),
        );
    }
    
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(
            field.name().to_string(),
            Value::Number(value.into()),
        );
    }
    
    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.fields.insert(
                field.name().to_string(),
                Value::Number(n),
            );
        }
    }
    
    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(
            field.name().to_string(),
            Value::Bool(value),
        );
    }
}

impl JsonVisitor {
    /// Извлечь метрики производительности из полей
    fn extract_performance_metrics(&self) -> Option<PerformanceMetrics> {
        if self.fields.is_empty() {
            return None;
        }
        
        // Метрики производительности сопровождают только те события,
        // что сами измеряют длительность.
        let duration_ms = self.get_u64_field("duration_ms")?;
        Some(PerformanceMetrics {
            duration_ms,
            memory_used_bytes: self.get_u64_field("memory_bytes"),
            cpu_usage_percent: self.get_f64_field("cpu_usage").map(|v| v as f32),
            io_operations: self.get_u64_field("io_operations"),
            cache_hits: self.get_u64_field("cache_hits"),
            cache_misses: self.get_u64_field("cache_misses"),
        })
    }
    
    fn get_u64_field(&self, name: &str) -> Option<u64> {
        self.fields.get(name)
            .and_then(|v| v.as_u64())
    }
    
    fn get_f64_field(&self, name: &str) -> Option<f64> {
        self.fields.get(name)
            .and_then(|v| v.as_f64())
    }
}

/// Конфигурация для structured logging
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    level: String,
    json_output: bool,
    pretty_print: bool,
    color_output: bool,
    log_file: Option<String>,
    max_file_size: Option<u64>,
    include_context: bool,
    include_line_numbers: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_output: false,
            pretty_print: false,
            color_output: true,
            log_file: None,
            max_file_size: Some(100 * 1024 * 1024), // 100MB
            include_context: true,
            include_line_numbers: cfg!(debug_assertions),
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_json_output(mut self, json_output: bool) -> Self {
        self.json_output = json_output;
        self
    }

    pub fn with_pretty_print(mut self, pretty_print: bool) -> Self {
        self.pretty_print = pretty_print;
        self
    }

    pub fn with_color_output(mut self, color_output: bool) -> Self {
        self.color_output = color_output;
        self
    }

    pub fn with_log_file(mut self, log_file: impl Into<String>) -> Self {
        self.log_file = Some(log_file.into());
        self
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn json_output(&self) -> bool {
        self.json_output
    }

    pub fn pretty_print(&self) -> bool {
        self.pretty_print
    }
}

/// Инициализировать structured logging со стандартной конфигурацией
pub fn init_structured_logging() -> anyhow::Result<()> {
    init_structured_logging_with_config(LoggingConfig::default())
}

/// Инициализировать structured logging с переданной конфигурацией
pub fn init_structured_logging_with_config(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    if config.json_output {
        // JSON формат для production
        let json_layer = JsonFormatter;

        let subscriber = Registry::default().with(env_filter).with(json_layer);

        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        // Человекочитаемый формат для разработки
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_line_number(config.include_line_numbers)
            .with_ansi(config.color_output)
            .with_span_events(FmtSpan::CLOSE);

        let subscriber = Registry::default().with(env_filter).with(fmt_layer);

        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

/// Макрос для структурированного логирования с метриками
#[macro_export]
macro_rules! log_with_metrics {
    ($level:expr, $message:expr, $($field:tt)*) => {
        match $level {
            tracing::Level::ERROR => tracing::error!($($field)*, message = $message),
            tracing::Level::WARN => tracing::warn!($($field)*, message = $message),
            tracing::Level::INFO => tracing::info!($($field)*, message = $message),
            tracing::Level::DEBUG => tracing::debug!($($field)*, message = $message),
            tracing::Level::TRACE => tracing::trace!($($field)*, message = $message),
        }
    };
}

/// Вспомогательная структура для измерения времени операций
pub struct OperationTimer {
    start: std::time::Instant,
    operation_name: String,
    fields: HashMap<String, Value>,
}

impl OperationTimer {
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            start: std::time::Instant::now(),
            operation_name: operation_name.into(),
            fields: HashMap::new(),
        }
    }
    
    pub fn add_field(&mut self, key: impl Into<String>, value: impl Serialize) {
        if let Ok(v) = serde_json::to_value(value) {
            self.fields.insert(key.into(), v);
        }
    }

    /// Время, прошедшее с момента создания таймера.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    fn metrics(&self) -> PerformanceMetrics {
        PerformanceMetrics {
            duration_ms: self.start.elapsed().as_millis() as u64,
            memory_used_bytes: None,
            cpu_usage_percent: None,
            io_operations: None,
            cache_hits: None,
            cache_misses: None,
        }
    }

    pub fn finish(self) -> PerformanceMetrics {
        let metrics = self.metrics();

        tracing::info!(
            operation = %self.operation_name,
            duration_ms = metrics.duration_ms,
            success = true,
            fields = ?self.fields,
            "Operation completed"
        );

        metrics
    }

    /// Завершает таймер и передаёт собранные метрики в замыкание,
    /// возвращая его результат.
    pub fn finish_with<T>(self, f: impl FnOnce(&PerformanceMetrics) -> T) -> T {
        let metrics = self.metrics();

        tracing::info!(
            operation = %self.operation_name,
            duration_ms = metrics.duration_ms,
            fields = ?self.fields,
            "Operation completed"
        );

        f(&metrics)
    }

    pub fn finish_with_result<T>(
        self,
        result: Result<T, impl std::fmt::Display>,
    ) -> PerformanceMetrics {
        let metrics = self.metrics();

        match result {
            Ok(_) => {
                tracing::info!(
                    operation = %self.operation_name,
                    duration_ms = metrics.duration_ms,
                    success = true,
                    fields = ?self.fields,
                    "Operation completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    operation = %self.operation_name,
                    duration_ms = metrics.duration_ms,
                    success = false,
                    error = %e,
                    fields = ?self.fields,
                    "Operation failed"
                );
            }
        }

        metrics
    }
}

/// Контекст запроса для отслеживания через async операции
#[derive(Clone)]
pub struct RequestContext {
    request_id: String,
    user_id: Option<String>,
    start_time: std::time::Instant,
    metadata: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            user_id: None,
            start_time: std::time::Instant::now(),
            metadata: HashMap::new(),
        }
    }

    /// Строит контекст со случайным request_id.
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_structured_log_entry_serialization() {
        let entry = StructuredLogEntry {
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            level: "INFO".to_string(),
            target: "test::module".to_string(),
            message: "Test message".to_string(),
            fields: HashMap::new(),
            context: Some(ExecutionContext::default()),
            performance: Some(PerformanceMetrics {
                duration_ms: 100,
                cpu_usage_percent: Some(25.5),
                memory_used_bytes: Some(1024 * 1024),
                io_operations: Some(1000),
                cache_hits: None,
                cache_misses: None,
            }),
        };

        let json = serde_json::to_string_pretty(&entry).unwrap();
        assert!(json.contains("timestamp"));
        assert!(json.contains("INFO"));
        assert!(json.contains("Test message"));
        assert!(json.contains("duration_ms"));
    }

    #[test]
    fn test_operation_timer() {
        let mut timer = OperationTimer::new("test_operation");
        timer.add_field("user_id", "12345");
        timer.add_field("items_count", 100);

        // Симулируем работу
        std::thread::sleep(std::time::Duration::from_millis(10));

        let metrics = timer.finish();
        assert!(metrics.duration_ms >= 10);
    }

    #[test]
    fn test_request_context_generate_is_unique() {
        let a = RequestContext::generate();
        let b = RequestContext::generate();
        assert_ne!(a.request_id(), b.request_id());
    }
}