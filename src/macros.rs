/// Declares free accessor functions backed by hidden [`Singleton`](crate::Singleton) statics.
///
/// ```text
/// lazy_singleton! {
///    [pub] fn NAME() -> TYPE = CONSTRUCTOR;
///    ...
/// }
/// ```
///
/// `CONSTRUCTOR` is any path or non-capturing closure callable as
/// `fn() -> Result<TYPE, E>` where `E: Into<BoxError>`. Each generated function
/// returns `Result<&'static TYPE, ConstructionFailure>` and builds the instance
/// on its first successful call.
///
/// ```rust
/// use lazy_singleton::lazy_singleton;
///
/// #[derive(Debug)]
/// struct Settings {
///    workers: usize,
/// }
///
/// fn load_settings() -> Result<Settings, std::num::ParseIntError> {
///    Ok(Settings { workers: "8".parse()? })
/// }
///
/// lazy_singleton! {
///    /// Settings shared by the whole process.
///    pub fn settings() -> Settings = load_settings;
/// }
///
/// assert_eq!(settings().unwrap().workers, 8);
/// assert!(std::ptr::eq(settings().unwrap(), settings().unwrap()));
/// ```
#[macro_export]
macro_rules! lazy_singleton {
   ($(
      $(#[$attr:meta])*
      $vis:vis fn $name:ident() -> $ty:ty = $ctor:expr;
   )+) => {
      $(
         $(#[$attr])*
         $vis fn $name() -> ::core::result::Result<&'static $ty, $crate::ConstructionFailure> {
            static INSTANCE: $crate::Singleton<$ty> = $crate::Singleton::new(|| {
               ($ctor)().map_err(::core::convert::Into::<$crate::BoxError>::into)
            });
            INSTANCE.instance()
         }
      )+
   };
}
