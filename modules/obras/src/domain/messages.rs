//! User-facing messages, in the language the backoffice is used in.

pub const LOGIN_BAD_CREDENTIALS: &str = "Credenciales incorrectas. Inténtalo de nuevo.";
pub const LOGIN_SERVER_ERROR: &str = "Error en el servidor. Intenta más tarde.";
pub const LOGIN_UNKNOWN: &str = "Error desconocido al iniciar sesión.";
pub const SERVER_UNREACHABLE: &str = "No se pudo conectar con el servidor. Intenta más tarde.";

pub const SESSION_EXPIRED: &str = "Tu sesión ha expirado. Inicia sesión nuevamente.";
pub const NOT_SIGNED_IN: &str = "Debes iniciar sesión para continuar.";
pub const LOGOUT_FAILED: &str = "No se pudo cerrar la sesión en este equipo.";
pub const ADMIN_ONLY: &str = "Esta acción requiere permisos de administrador.";
pub const FILL_ALL_FIELDS: &str = "Por favor, complete todos los campos.";

pub const LIST_WORKS_FAILED: &str = "Error al obtener las obras.";
pub const CREATE_WORK_FAILED: &str = "Error al crear la obra. Intente nuevamente.";
pub const UPDATE_WORK_FAILED: &str = "Error al actualizar la obra. Intente nuevamente.";
pub const LOAD_WORK_FAILED: &str = "Error al obtener los datos de la obra o los usuarios.";
pub const WORK_DETAIL_FAILED: &str = "Error al obtener los detalles de la obra.";
pub const END_BEFORE_START: &str = "La fecha de fin no puede ser anterior a la fecha de inicio.";

pub const CREATE_SUBGROUP_FAILED: &str = "Error al crear el subgrupo.";
pub const CREATE_PART_FAILED: &str = "Error al crear la partida.";
pub const PART_DETAIL_FAILED: &str = "Error al obtener los detalles de la partida.";

pub const SAVE_EXPENSE_FAILED: &str = "Error al guardar el gasto.";
pub const DELETE_EXPENSE_FAILED: &str = "Error al eliminar el gasto.";
pub const EXPENSE_NOT_OWNED: &str = "Solo puedes modificar tus propios gastos.";
pub const EXPENSE_DATE_IN_FUTURE: &str = "La fecha del gasto no puede ser futura.";
pub const RECEIPT_BAD_TYPE: &str = "Formato de recibo no permitido. Usa JPG, PNG o PDF.";
pub const RECEIPT_FAILED: &str = "Error al obtener el recibo.";
pub const RECEIPT_MISSING: &str = "No disponible";

pub const LIST_USERS_FAILED: &str = "Error al obtener los usuarios.";
pub const USER_DETAIL_FAILED: &str = "Error al obtener los detalles del usuario.";
pub const LOAD_USER_FAILED: &str = "Error al obtener los datos del usuario.";
pub const REGISTER_USER_FAILED: &str = "Error al registrar el usuario. Intente nuevamente.";
pub const UPDATE_USER_FAILED: &str = "Error al actualizar el usuario. Intente nuevamente.";
pub const EDIT_OTHER_USER: &str = "No tienes permiso para editar este usuario.";
pub const VIEW_OTHER_USER: &str = "No tienes permiso para ver este usuario.";
pub const PASSWORD_MISMATCH: &str = "Las contraseñas no coinciden";
pub const PASSWORD_CHANGE_FAILED: &str =
    "Error al actualizar la contraseña. Verifica tu contraseña actual.";

pub const DELETE_ADMIN_REJECTED: &str = "No puedes eliminar a un administrador.";
pub const DELETE_USER_HAS_WORKS: &str =
    "No se puede eliminar el usuario porque tiene obras a cargo.";
pub const FORBIDDEN: &str = "No tienes permiso para realizar esta acción.";
pub const DELETE_USER_FORBIDDEN: &str = "No tienes permiso para eliminar este usuario.";
pub const DELETE_USER_UNEXPECTED: &str = "Ocurrió un error inesperado al eliminar el usuario.";

pub const NO_WORKS_IN_CHARGE: &str = "No hay obras a cargo.";
pub const UNCATEGORIZED_TAB: &str = "Sin Categoría";
pub const UNKNOWN_AUTHOR: &str = "Desconocido";
