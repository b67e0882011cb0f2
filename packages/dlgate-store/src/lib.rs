pub mod products;

pub use products::{
    DownloadLinks, LinuxLinks, LocalizedText, PlatformLinks, Product, ProductStore, ProductsData,
    WindowsLinks,
};
