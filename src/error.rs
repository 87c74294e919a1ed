use thiserror::Error;

/// Errores del núcleo de reproducción.
///
/// Ninguno de estos errores es fatal para una sesión: la máquina de estados
/// los convierte en un avance de cola o en un mensaje para el usuario.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// URL no válida o fuente no soportada. Sin cambio de estado.
    #[error("URL no válida o fuente no soportada: {0}")]
    InvalidTrack(String),

    /// Falló la obtención de metadata o del stream de audio.
    #[error("No se pudo resolver la fuente: {0}")]
    Resolution(String),

    /// Falló el join, la suscripción o la reproducción en el canal de voz.
    #[error("Error en el transporte de voz: {0}")]
    Transport(String),

    /// El mensaje de estado fue borrado externamente.
    #[error("El mensaje ya no existe")]
    MessageGone,

    /// Cualquier otro fallo al enviar texto al canal.
    #[error("Error al enviar mensaje: {0}")]
    Messaging(String),
}

pub type Result<T> = std::result::Result<T, PlayerError>;
